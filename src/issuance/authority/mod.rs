use async_trait::async_trait;
use std::fmt::Debug;

use crate::core::error::Result;
use crate::core::types::{CertificatePage, CertificateRecord, CertificateRequest, TagSet};

mod acm;

pub use acm::AcmAuthority;

/// Typed view of the certificate authority. Implementations carry no
/// reconciliation logic.
#[async_trait]
pub trait CertificateAuthority: Send + Sync + Debug {
    /// Returns one page of the certificate listing starting at `next_token`.
    async fn list_certificates(&self, next_token: Option<String>) -> Result<CertificatePage>;

    /// Requests a DNS-validated certificate and returns its identifier.
    async fn request_certificate(&self, request: &CertificateRequest) -> Result<String>;

    async fn describe_certificate(&self, arn: &str) -> Result<CertificateRecord>;

    async fn delete_certificate(&self, arn: &str) -> Result<()>;

    async fn list_tags(&self, arn: &str) -> Result<TagSet>;

    async fn add_tags(&self, arn: &str, tags: &TagSet) -> Result<()>;

    async fn remove_tags(&self, arn: &str, tags: &TagSet) -> Result<()>;

    /// Blocks until the authority reports the certificate validated. Returns a
    /// service error when validation fails or the wait gives up.
    async fn wait_until_validated(&self, arn: &str) -> Result<()>;
}
