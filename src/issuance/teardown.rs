//! Delete path: validation records first, then the certificate.

use futures::future::try_join_all;
use log::info;

use super::flow::find_certificate;
use super::{Services, log_failure};
use crate::core::config::ResolvedConfig;
use crate::core::error::Result;
use crate::core::types::{TeardownOutcome, ZoneTarget};
use crate::issuance::dns_providers::DnsZoneClient;
use crate::issuance::zones::{
    assign_options, change_comment, existing_validation_records, list_all_record_sets,
    plan_deletes, resolve_zones,
};

const COMPONENT: &str = "cert-delete";

/// Removes the certificate for `config.domain` and the validation records it
/// owns. Nothing to delete is not an error, and a partially torn down state
/// can be retried from scratch.
pub async fn teardown(services: Services<'_>, config: &ResolvedConfig) -> Result<TeardownOutcome> {
    if !config.enabled {
        info!(
            "[{COMPONENT}] Certificate management disabled for {}, nothing to delete",
            config.domain
        );
        return Ok(TeardownOutcome::Disabled);
    }

    config
        .require_zones()
        .map_err(|e| log_failure(COMPONENT, "configuration", config, e))?;

    let Some(summary) = find_certificate(services.authority, &config.domain)
        .await
        .map_err(|e| log_failure(COMPONENT, "list certificates", config, e))?
    else {
        info!(
            "[{COMPONENT}] Certificate for {} in {} does not exist. Skipping ...",
            config.domain, config.region
        );
        return Ok(TeardownOutcome::NotFound);
    };

    let record = services
        .authority
        .describe_certificate(&summary.arn)
        .await
        .map_err(|e| log_failure(COMPONENT, "describe certificate", config, e))?;

    let zones = resolve_zones(services.dns, config)
        .await
        .map_err(|e| log_failure(COMPONENT, "resolve hosted zones", config, e))?;
    let targets = assign_options(&record.validation_options, &zones)
        .map_err(|e| log_failure(COMPONENT, "plan validation records", config, e))?;

    delete_validation_records(services.dns, &targets, &config.domain)
        .await
        .map_err(|e| log_failure(COMPONENT, "delete validation records", config, e))?;

    services
        .authority
        .delete_certificate(&summary.arn)
        .await
        .map_err(|e| log_failure(COMPONENT, "delete certificate", config, e))?;
    info!(
        "[{COMPONENT}] Deleted certificate {} for {}",
        summary.arn, config.domain
    );

    Ok(TeardownOutcome::Deleted { arn: summary.arn })
}

/// Deletes the validation records that still exist, one batch per zone.
async fn delete_validation_records(
    dns: &dyn DnsZoneClient,
    targets: &[ZoneTarget],
    domain: &str,
) -> Result<()> {
    let comment = change_comment(domain);

    try_join_all(targets.iter().map(|target| {
        let comment = comment.as_str();
        async move {
            let zone_id = target.zone.zone_id.as_str();
            let live = list_all_record_sets(dns, zone_id).await?;
            let existing = existing_validation_records(target, &live);

            if existing.is_empty() {
                info!(
                    "[{COMPONENT}] No validation records for {} left in zone {}. Skipping ...",
                    domain, zone_id
                );
                return Ok(());
            }

            let changes = plan_deletes(&existing);
            info!(
                "[{COMPONENT}] Deleting {} validation record(s) from zone {}",
                changes.len(),
                zone_id
            );
            dns.change_record_sets(zone_id, comment, &changes).await
        }
    }))
    .await?;

    Ok(())
}
