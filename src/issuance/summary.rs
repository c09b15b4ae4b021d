use log::{debug, info};

use super::flow::find_certificate;
use super::log_failure;
use crate::core::config::ResolvedConfig;
use crate::core::error::Result;
use crate::core::types::CertificateRecord;
use crate::domain::normalize_domain;
use crate::issuance::authority::CertificateAuthority;

/// Describes the certificate for `domain`, if one exists. A certificate
/// deleted between the listing and the describe call counts as absent.
pub async fn describe_existing(
    authority: &dyn CertificateAuthority,
    domain: &str,
) -> Result<Option<CertificateRecord>> {
    let Some(summary) = find_certificate(authority, domain).await? else {
        return Ok(None);
    };
    match authority.describe_certificate(&summary.arn).await {
        Ok(record) => Ok(Some(record)),
        Err(e) if e.is_not_found() => {
            debug!("[cert-summary] {} vanished before it was described", summary.arn);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub async fn summarize(
    authority: &dyn CertificateAuthority,
    config: &ResolvedConfig,
) -> Result<Option<CertificateRecord>> {
    let record = describe_existing(authority, &config.domain)
        .await
        .map_err(|e| log_failure("cert-summary", "describe certificate", config, e))?;

    match &record {
        Some(record) => info!("[cert-summary] {}", record),
        None => info!(
            "[cert-summary] No certificate for {} in {}",
            config.domain, config.region
        ),
    }
    Ok(record)
}

/// Reads one property of the certificate for `domain`.
///
/// Returns an empty string when the certificate or the property is missing,
/// or when the lookup itself fails. Callers may evaluate this before the
/// certificate or credentials exist.
pub async fn lookup_property(
    authority: &dyn CertificateAuthority,
    domain: &str,
    property: &str,
) -> String {
    let domain = match normalize_domain(domain) {
        Ok(domain) => domain,
        Err(e) => {
            debug!("[cert-summary] Lookup of {property} for {domain:?} skipped: {e}");
            return String::new();
        }
    };

    match describe_existing(authority, &domain).await {
        Ok(Some(record)) => record.property(property).unwrap_or_else(|| {
            debug!("[cert-summary] Certificate for {domain} has no property {property}");
            String::new()
        }),
        Ok(None) => {
            debug!("[cert-summary] No certificate for {domain}, {property} is blank");
            String::new()
        }
        Err(e) => {
            debug!("[cert-summary] Lookup of {property} for {domain} failed: {e}");
            String::new()
        }
    }
}
