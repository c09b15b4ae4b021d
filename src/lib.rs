pub mod core;
pub mod domain;
pub mod issuance;
pub mod storage;

use log::info;

pub use crate::core::config::{CertificateConfig, ResolvedConfig, ValidationTiming};
pub use crate::core::error::{CertificateError, Result};
pub use crate::core::types::{CertificateRecord, CertificateResult, TeardownOutcome};
pub use crate::issuance::Services;
pub use crate::issuance::authority::CertificateAuthority;
pub use crate::issuance::summary::lookup_property;

/// Creates the certificate for `config.domain`, or reuses the one that
/// already exists. Returns `None` when certificate handling is disabled.
pub async fn create_certificate(
    services: Services<'_>,
    config: &ResolvedConfig,
) -> Result<Option<CertificateRecord>> {
    if !config.enabled {
        info!(
            "[cert-create] Certificate management disabled for {}. Skipping ...",
            config.domain
        );
        return Ok(None);
    }
    issuance::flow::reconcile(services, config).await.map(Some)
}

/// Deletes the certificate for `config.domain` and its validation records.
pub async fn delete_certificate(
    services: Services<'_>,
    config: &ResolvedConfig,
) -> Result<TeardownOutcome> {
    issuance::teardown::teardown(services, config).await
}

/// Logs and returns the current certificate for `config.domain`, if any.
pub async fn summarize(
    authority: &dyn CertificateAuthority,
    config: &ResolvedConfig,
) -> Result<Option<CertificateRecord>> {
    issuance::summary::summarize(authority, config).await
}
