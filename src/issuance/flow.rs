//! Create path: reuse or request a certificate, publish its validation
//! records, reconcile tags, wait for validation, persist the identifier.

use std::collections::BTreeSet;

use log::{info, warn};

use super::{Services, log_failure};
use crate::core::config::ResolvedConfig;
use crate::core::error::{CertificateError, Result};
use crate::core::types::{
    CertificateRecord, CertificateResult, CertificateStatus, CertificateSummary, HostedZone,
    ZoneTarget,
};
use crate::domain::{normalize_domain, validatable_name};
use crate::issuance::authority::CertificateAuthority;
use crate::issuance::retry::collect_pages;
use crate::issuance::tags::apply_tags;
use crate::issuance::zones::{
    assign_options, check_coverage, resolve_zones, write_validation_records,
};

const COMPONENT: &str = "cert-create";

/// Finds the certificate whose domain name equals `domain`, reading every
/// page of the authority's listing.
pub async fn find_certificate(
    authority: &dyn CertificateAuthority,
    domain: &str,
) -> Result<Option<CertificateSummary>> {
    let certificates = collect_pages("acm.list_certificates", |token: Option<String>| async move {
        let page = authority.list_certificates(token).await?;
        Ok::<_, CertificateError>((page.certificates, page.next_token))
    })
    .await?;

    let mut matching = certificates.into_iter().filter(|summary| {
        normalize_domain(&summary.domain_name)
            .map(|name| name == domain)
            .unwrap_or(false)
    });
    let found = matching.next();
    if let Some(extra) = matching.next() {
        warn!(
            "[{COMPONENT}] More than one certificate exists for {}, using the first (also found {})",
            domain, extra.arn
        );
    }
    Ok(found)
}

/// Routes a freshly requested certificate's validation options to zones
/// after checking the authority published one for every validatable name.
fn validation_targets(
    record: &CertificateRecord,
    config: &ResolvedConfig,
    zones: &[HostedZone],
) -> Result<Vec<ZoneTarget>> {
    let missing: Vec<String> = config
        .validatable_names()
        .into_iter()
        .filter(|name| {
            !record.validation_options.iter().any(|option| {
                normalize_domain(&option.domain_name)
                    .map(|domain| validatable_name(&domain) == name)
                    .unwrap_or(false)
            })
        })
        .collect();

    if !missing.is_empty() {
        return Err(CertificateError::service(
            "acm.describe_certificate",
            format!(
                "validation records for {} are not available yet on {}",
                missing.join(", "),
                record.arn
            ),
        ));
    }

    assign_options(&record.validation_options, zones)
}

/// Names present on only one side of the certificate and the configuration.
fn name_drift(record: &CertificateRecord, config: &ResolvedConfig) -> Vec<String> {
    let on_certificate: BTreeSet<String> = std::iter::once(&record.domain_name)
        .chain(&record.subject_alternative_names)
        .filter_map(|name| normalize_domain(name).ok())
        .collect();
    let configured: BTreeSet<String> = std::iter::once(&config.domain)
        .chain(&config.subject_alternative_names)
        .cloned()
        .collect();
    on_certificate
        .symmetric_difference(&configured)
        .cloned()
        .collect()
}

fn persist(services: Services<'_>, arn: &str, config: &ResolvedConfig) -> Result<()> {
    services.sink.persist(&CertificateResult {
        certificate_arn: arn.to_string(),
        domain: config.domain.clone(),
    })
}

/// Brings the certificate for `config.domain` to its desired state and
/// returns it. Running it again with the same configuration reuses the
/// existing certificate.
pub async fn reconcile(services: Services<'_>, config: &ResolvedConfig) -> Result<CertificateRecord> {
    config
        .require_zones()
        .map_err(|e| log_failure(COMPONENT, "configuration", config, e))?;

    info!(
        "[{COMPONENT}] Trying to create certificate for {} in {}",
        config.domain, config.region
    );

    let existing = find_certificate(services.authority, &config.domain)
        .await
        .map_err(|e| log_failure(COMPONENT, "list certificates", config, e))?;

    if let Some(summary) = existing {
        return reconcile_existing(services, config, &summary.arn).await;
    }

    let zones = resolve_zones(services.dns, config)
        .await
        .map_err(|e| log_failure(COMPONENT, "resolve hosted zones", config, e))?;
    check_coverage(&config.validatable_names(), &zones)
        .map_err(|e| log_failure(COMPONENT, "hosted zone coverage", config, e))?;

    let arn = services
        .authority
        .request_certificate(&config.certificate_request())
        .await
        .map_err(|e| log_failure(COMPONENT, "request certificate", config, e))?;
    info!("[{COMPONENT}] Requested certificate {arn}");

    // Validation metadata shows up on the certificate shortly after the request.
    tokio::time::sleep(config.settle_delay).await;

    let mut record = services
        .authority
        .describe_certificate(&arn)
        .await
        .map_err(|e| log_failure(COMPONENT, "describe certificate", config, e))?;

    let targets = validation_targets(&record, config, &zones)
        .map_err(|e| log_failure(COMPONENT, "plan validation records", config, e))?;
    write_validation_records(
        services.dns,
        &targets,
        &config.domain,
        config.rewrite_records,
        false,
    )
    .await
    .map_err(|e| log_failure(COMPONENT, "write validation records", config, e))?;
    info!("[{COMPONENT}] DNS validation records created, waiting for validation");

    apply_tags(services.authority, &arn, &config.tags)
        .await
        .map_err(|e| log_failure(COMPONENT, "tag certificate", config, e))?;

    wait_for_validation(services, config, &arn).await?;
    record.status = CertificateStatus::Issued;

    persist(services, &arn, config)
        .map_err(|e| log_failure(COMPONENT, "persist result", config, e))?;
    info!("[{COMPONENT}] Certificate {} for {} is issued", arn, config.domain);
    Ok(record)
}

async fn wait_for_validation(
    services: Services<'_>,
    config: &ResolvedConfig,
    arn: &str,
) -> Result<()> {
    info!("[cert-wait] Waiting for {} to be validated", arn);
    services
        .authority
        .wait_until_validated(arn)
        .await
        .map_err(|e| log_failure(COMPONENT, "wait for validation", config, e))
}

async fn reconcile_existing(
    services: Services<'_>,
    config: &ResolvedConfig,
    arn: &str,
) -> Result<CertificateRecord> {
    let mut record = services
        .authority
        .describe_certificate(arn)
        .await
        .map_err(|e| log_failure(COMPONENT, "describe certificate", config, e))?;

    match record.status {
        CertificateStatus::Issued => {
            info!(
                "[{COMPONENT}] Certificate for {} in {} already exists. Skipping ...",
                config.domain, config.region
            );
            apply_tags(services.authority, arn, &config.tags)
                .await
                .map_err(|e| log_failure(COMPONENT, "tag certificate", config, e))?;
        }
        CertificateStatus::PendingValidation => {
            info!(
                "[{COMPONENT}] Certificate {} is pending validation, resuming",
                arn
            );
            let drift = name_drift(&record, config);
            if !drift.is_empty() {
                let err = CertificateError::configuration(format!(
                    "certificate {} was requested for other names than configured ({}); \
                     delete it to request a new one",
                    arn,
                    drift.join(", ")
                ));
                return Err(log_failure(COMPONENT, "compare certificate names", config, err));
            }
            let zones = resolve_zones(services.dns, config)
                .await
                .map_err(|e| log_failure(COMPONENT, "resolve hosted zones", config, e))?;
            let targets = assign_options(&record.validation_options, &zones)
                .map_err(|e| log_failure(COMPONENT, "plan validation records", config, e))?;
            write_validation_records(
                services.dns,
                &targets,
                &config.domain,
                config.rewrite_records,
                true,
            )
            .await
            .map_err(|e| log_failure(COMPONENT, "write validation records", config, e))?;
            apply_tags(services.authority, arn, &config.tags)
                .await
                .map_err(|e| log_failure(COMPONENT, "tag certificate", config, e))?;
            wait_for_validation(services, config, arn).await?;
            record.status = CertificateStatus::Issued;
        }
        ref status => {
            warn!(
                "[{COMPONENT}] Certificate {} for {} is in status {}, leaving it as is",
                arn, config.domain, status
            );
            apply_tags(services.authority, arn, &config.tags)
                .await
                .map_err(|e| log_failure(COMPONENT, "tag certificate", config, e))?;
        }
    }

    persist(services, arn, config)
        .map_err(|e| log_failure(COMPONENT, "persist result", config, e))?;
    Ok(record)
}
