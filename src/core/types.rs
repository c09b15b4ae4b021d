use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// TTL applied to every DNS validation record.
pub const VALIDATION_RECORD_TTL: i64 = 60;

/// Desired or observed tags on a certificate. Ordered so change sets and logs
/// are stable.
pub type TagSet = BTreeMap<String, String>;

/// Lifecycle state reported by the certificate authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    PendingValidation,
    Issued,
    Failed,
    /// Any other authority state (revoked, expired, timed out, ...).
    #[serde(untagged)]
    Other(String),
}

impl CertificateStatus {
    pub fn from_authority(raw: &str) -> Self {
        match raw {
            "PENDING_VALIDATION" => CertificateStatus::PendingValidation,
            "ISSUED" => CertificateStatus::Issued,
            "FAILED" => CertificateStatus::Failed,
            other => CertificateStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CertificateStatus::PendingValidation => "PENDING_VALIDATION",
            CertificateStatus::Issued => "ISSUED",
            CertificateStatus::Failed => "FAILED",
            CertificateStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters sent to the authority when a new certificate is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub domain: String,
    pub subject_alternative_names: Vec<String>,
    pub idempotency_token: Option<String>,
    pub tags: TagSet,
}

/// One entry of the authority's certificate listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    pub arn: String,
    pub domain_name: String,
}

/// A single page of the certificate listing.
#[derive(Debug, Clone, Default)]
pub struct CertificatePage {
    pub certificates: Vec<CertificateSummary>,
    pub next_token: Option<String>,
}

/// DNS record the authority wants published for one validatable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOption {
    pub domain_name: String,
    pub record_name: String,
    pub record_value: String,
    pub record_type: String,
}

/// Certificate as described by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    pub arn: String,
    pub domain_name: String,
    pub status: CertificateStatus,
    #[serde(default)]
    pub subject_alternative_names: Vec<String>,
    #[serde(default)]
    pub validation_options: Vec<ValidationOption>,
}

impl CertificateRecord {
    /// Looks up a property by the authority's field name.
    pub fn property(&self, name: &str) -> Option<String> {
        match name {
            "CertificateArn" => Some(self.arn.clone()),
            "DomainName" => Some(self.domain_name.clone()),
            "Status" => Some(self.status.to_string()),
            "SubjectAlternativeNames" => Some(self.subject_alternative_names.join(",")),
            _ => None,
        }
    }
}

impl fmt::Display for CertificateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Certificate for {}", self.domain_name)?;
        writeln!(f, "  arn:    {}", self.arn)?;
        write!(f, "  status: {}", self.status)?;
        if !self.subject_alternative_names.is_empty() {
            write!(f, "\n  sans:   {}", self.subject_alternative_names.join(", "))?;
        }
        for option in &self.validation_options {
            write!(
                f,
                "\n  {} {} {} -> {}",
                option.domain_name, option.record_type, option.record_name, option.record_value
            )?;
        }
        Ok(())
    }
}

/// Hosted zone as listed by the DNS service. Ids are stored without the
/// `/hostedzone/` prefix, names lower-cased and without the trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostedZone {
    pub zone_id: String,
    pub zone_name: String,
}

/// A resolved zone together with the validation options it is responsible for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTarget {
    pub zone: HostedZone,
    pub options: Vec<ValidationOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Upsert,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "CREATE",
            ChangeAction::Upsert => "UPSERT",
            ChangeAction::Delete => "DELETE",
        }
    }
}

/// One entry of a change batch. A DELETE must carry every value of the live
/// record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChange {
    pub action: ChangeAction,
    pub name: String,
    pub values: Vec<String>,
    pub ttl: i64,
    pub record_type: String,
}

/// Record set as listed by the DNS service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    pub name: String,
    pub record_type: String,
    pub ttl: Option<i64>,
    pub values: Vec<String>,
    pub set_identifier: Option<String>,
}

/// Continuation cursor for record set listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSetCursor {
    pub name: String,
    pub record_type: String,
    pub identifier: Option<String>,
}

/// One page of a record set listing. `next` is set while the listing is
/// truncated.
#[derive(Debug, Clone, Default)]
pub struct RecordSetPage {
    pub record_sets: Vec<RecordSet>,
    pub next: Option<RecordSetCursor>,
}

/// Payload handed to the result sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateResult {
    #[serde(rename = "CertificateArn")]
    pub certificate_arn: String,
    #[serde(rename = "Domain")]
    pub domain: String,
}

/// Outcome of the delete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownOutcome {
    Disabled,
    NotFound,
    Deleted { arn: String },
}
