//! Hosted zone resolution and validation record planning.
//!
//! Zones come from the configured ids and names. Each validation option is
//! routed to the zone with the longest name that is a suffix of the option's
//! domain; zones sharing that name all receive the record.

use std::collections::HashSet;

use futures::future::try_join_all;
use log::{debug, info, warn};

use crate::core::config::ResolvedConfig;
use crate::core::error::{CertificateError, Result};
use crate::core::types::{
    ChangeAction, HostedZone, RecordChange, RecordSet, RecordSetCursor, ValidationOption,
    VALIDATION_RECORD_TTL, ZoneTarget,
};
use crate::domain::{matches_zone, normalize_record_name};
use crate::issuance::dns_providers::DnsZoneClient;
use crate::issuance::retry::collect_pages;

/// Lists hosted zones and keeps those selected by id or by name.
pub async fn resolve_zones(
    dns: &dyn DnsZoneClient,
    config: &ResolvedConfig,
) -> Result<Vec<HostedZone>> {
    let available = dns.list_hosted_zones().await?;
    let zones = select_zones(&available, &config.zone_ids, &config.zone_names);

    for id in &config.zone_ids {
        if !zones.iter().any(|zone| &zone.zone_id == id) {
            warn!("[dns-zones] Configured hosted zone id {id} was not found");
        }
    }
    for name in &config.zone_names {
        if !zones.iter().any(|zone| &zone.zone_name == name) {
            warn!("[dns-zones] Configured hosted zone name {name} was not found");
        }
    }

    if zones.is_empty() {
        return Err(CertificateError::configuration(format!(
            "no hosted zone for domain {} found",
            config.domain
        )));
    }

    info!(
        "[dns-zones] Resolved {} hosted zone(s) for {}: {}",
        zones.len(),
        config.domain,
        zones
            .iter()
            .map(|zone| format!("{} ({})", zone.zone_name, zone.zone_id))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(zones)
}

pub fn select_zones(
    available: &[HostedZone],
    zone_ids: &[String],
    zone_names: &[String],
) -> Vec<HostedZone> {
    available
        .iter()
        .filter(|zone| {
            zone_ids.contains(&zone.zone_id)
                || zone_names
                    .iter()
                    .any(|name| name == &zone.zone_name)
        })
        .cloned()
        .collect()
}

/// Zones responsible for `domain`: every matching zone whose name is the
/// longest match.
fn best_zones<'a>(domain: &str, zones: &'a [HostedZone]) -> Vec<&'a HostedZone> {
    let matching: Vec<&HostedZone> = zones
        .iter()
        .filter(|zone| matches_zone(domain, &zone.zone_name))
        .collect();
    let longest = matching
        .iter()
        .map(|zone| zone.zone_name.len())
        .max()
        .unwrap_or(0);
    matching
        .into_iter()
        .filter(|zone| zone.zone_name.len() == longest)
        .collect()
}

/// Fails when any of `names` has no responsible zone.
pub fn check_coverage(names: &[String], zones: &[HostedZone]) -> Result<()> {
    let uncovered: Vec<&str> = names
        .iter()
        .filter(|name| best_zones(name, zones).is_empty())
        .map(String::as_str)
        .collect();
    if uncovered.is_empty() {
        Ok(())
    } else {
        Err(CertificateError::configuration(format!(
            "no hosted zone for domain found: {}",
            uncovered.join(", ")
        )))
    }
}

/// Routes every validation option to its zone(s). Records shared by several
/// options (a domain and its wildcard) appear once per zone.
pub fn assign_options(
    options: &[ValidationOption],
    zones: &[HostedZone],
) -> Result<Vec<ZoneTarget>> {
    let mut targets: Vec<ZoneTarget> = Vec::new();
    let mut seen: HashSet<(String, String, String)> = HashSet::new();

    for option in options {
        let responsible = best_zones(&option.domain_name, zones);
        if responsible.is_empty() {
            return Err(CertificateError::configuration(format!(
                "no hosted zone for domain found: {}",
                option.domain_name
            )));
        }
        for zone in responsible {
            let key = (
                zone.zone_id.clone(),
                normalize_record_name(&option.record_name),
                option.record_type.to_uppercase(),
            );
            if !seen.insert(key) {
                debug!(
                    "[dns-zones] Record {} already planned for zone {}",
                    option.record_name, zone.zone_id
                );
                continue;
            }
            match targets.iter_mut().find(|target| &target.zone == zone) {
                Some(target) => target.options.push(option.clone()),
                None => targets.push(ZoneTarget {
                    zone: zone.clone(),
                    options: vec![option.clone()],
                }),
            }
        }
    }

    Ok(targets)
}

pub fn plan_changes(options: &[ValidationOption], action: ChangeAction) -> Vec<RecordChange> {
    options
        .iter()
        .map(|option| RecordChange {
            action,
            name: option.record_name.clone(),
            values: vec![option.record_value.clone()],
            ttl: VALIDATION_RECORD_TTL,
            record_type: option.record_type.clone(),
        })
        .collect()
}

fn same_record(option: &ValidationOption, record_set: &RecordSet) -> bool {
    normalize_record_name(&option.record_name) == normalize_record_name(&record_set.name)
        && option.record_type.eq_ignore_ascii_case(&record_set.record_type)
}

/// Live record sets that belong to this target's validation records.
pub fn existing_validation_records(target: &ZoneTarget, record_sets: &[RecordSet]) -> Vec<RecordSet> {
    record_sets
        .iter()
        .filter(|set| target.options.iter().any(|option| same_record(option, set)))
        .cloned()
        .collect()
}

/// Validation options of this target that are not present in the zone.
pub fn missing_validation_options(
    target: &ZoneTarget,
    record_sets: &[RecordSet],
) -> Vec<ValidationOption> {
    target
        .options
        .iter()
        .filter(|option| !record_sets.iter().any(|set| same_record(option, set)))
        .cloned()
        .collect()
}

/// DELETE changes mirroring the live record sets exactly.
pub fn plan_deletes(record_sets: &[RecordSet]) -> Vec<RecordChange> {
    record_sets
        .iter()
        .map(|set| RecordChange {
            action: ChangeAction::Delete,
            name: set.name.clone(),
            values: set.values.clone(),
            ttl: set.ttl.unwrap_or(VALIDATION_RECORD_TTL),
            record_type: set.record_type.clone(),
        })
        .collect()
}

pub fn change_comment(domain: &str) -> String {
    format!("DNS validation for certificate {domain}")
}

/// Reads every page of the zone's record sets.
pub async fn list_all_record_sets(dns: &dyn DnsZoneClient, zone_id: &str) -> Result<Vec<RecordSet>> {
    collect_pages("route53.list_resource_record_sets", |cursor: Option<RecordSetCursor>| async move {
        let page = dns.list_record_sets(zone_id, cursor).await?;
        Ok::<_, CertificateError>((page.record_sets, page.next))
    })
    .await
}

/// Writes the validation records of every target, one batch per zone. Zones
/// are written concurrently; the first failure fails the whole write.
///
/// With `only_missing` the zone is listed first and records already present
/// are left alone.
pub async fn write_validation_records(
    dns: &dyn DnsZoneClient,
    targets: &[ZoneTarget],
    domain: &str,
    rewrite: bool,
    only_missing: bool,
) -> Result<()> {
    let action = if rewrite {
        ChangeAction::Upsert
    } else {
        ChangeAction::Create
    };
    let comment = change_comment(domain);

    try_join_all(targets.iter().map(|target| {
        let comment = comment.as_str();
        async move {
            let zone_id = target.zone.zone_id.as_str();
            let options = if only_missing && !rewrite {
                let live = list_all_record_sets(dns, zone_id).await?;
                missing_validation_options(target, &live)
            } else {
                target.options.clone()
            };

            if options.is_empty() {
                info!(
                    "[dns-zones] Validation records for {} already present in zone {}",
                    domain, zone_id
                );
                return Ok(());
            }

            let changes = plan_changes(&options, action);
            info!(
                "[dns-zones] Writing {} validation record(s) to zone {} with {}",
                changes.len(),
                zone_id,
                action.as_str()
            );
            dns.change_record_sets(zone_id, comment, &changes).await
        }
    }))
    .await?;

    Ok(())
}
