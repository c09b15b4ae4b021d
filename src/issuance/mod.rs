use log::error;

use crate::core::config::ResolvedConfig;
use crate::core::error::CertificateError;
use crate::storage::result_sink::ResultSink;

pub mod authority;
pub mod dns_providers;
pub mod flow;
pub mod retry;
pub mod summary;
pub mod tags;
pub mod teardown;
pub mod zones;

use authority::CertificateAuthority;
use dns_providers::DnsZoneClient;

/// Collaborators used by the reconcilers for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct Services<'a> {
    pub authority: &'a dyn CertificateAuthority,
    pub dns: &'a dyn DnsZoneClient,
    pub sink: &'a dyn ResultSink,
}

/// Logs a failed step with enough context to diagnose it and hands the error back.
pub(crate) fn log_failure(
    component: &str,
    step: &str,
    config: &ResolvedConfig,
    err: CertificateError,
) -> CertificateError {
    error!(
        "[{}] {} failed for {} in {}: {}",
        component, step, config.domain, config.region, err
    );
    err
}
