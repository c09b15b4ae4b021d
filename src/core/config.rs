use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::core::error::{CertificateError, Result};
use crate::core::types::{CertificateRequest, TagSet};
use crate::domain::{normalize_domain, normalize_zone_id, validatable_name};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_CERT_INFO_FILE: &str = "cert-info.yml";

/// Regions where the authority cannot issue DNS-validated public certificates.
const UNSUPPORTED_REGIONS: &[&str] = &["cn-north-1", "cn-northwest-1"];

const MAX_IDEMPOTENCY_TOKEN_LEN: usize = 32;

const SETTLE_DELAY_ENV: &str = "CERT_CREATOR_SETTLE_DELAY_SECS";
const VALIDATION_POLL_ENV: &str = "CERT_CREATOR_VALIDATION_POLL_SECS";
const VALIDATION_ATTEMPTS_ENV: &str = "CERT_CREATOR_VALIDATION_MAX_ATTEMPTS";

const DEFAULT_SETTLE_DELAY_SECS: u64 = 10;
const DEFAULT_VALIDATION_POLL_SECS: u64 = 60;
const DEFAULT_VALIDATION_MAX_ATTEMPTS: u64 = 40;

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(rename = "customCertificate")]
    custom_certificate: CertificateConfig,
}

/// The `customCertificate` section as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateConfig {
    pub certificate_name: Option<String>,
    pub region: Option<String>,
    pub hosted_zone_id: Option<String>,
    #[serde(default)]
    pub hosted_zone_ids: Vec<String>,
    pub hosted_zone_name: Option<String>,
    #[serde(default)]
    pub hosted_zone_names: Vec<String>,
    pub idempotency_token: Option<String>,
    #[serde(default)]
    pub subject_alternative_names: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub rewrite_records: bool,
    pub enabled: Option<serde_yaml::Value>,
    #[serde(default)]
    pub write_cert_info_to_file: bool,
    pub cert_info_file_name: Option<String>,
}

/// Immutable configuration produced once per invocation by
/// [`CertificateConfig::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub domain: String,
    pub region: String,
    pub zone_ids: Vec<String>,
    pub zone_names: Vec<String>,
    pub idempotency_token: Option<String>,
    pub subject_alternative_names: Vec<String>,
    pub tags: TagSet,
    pub rewrite_records: bool,
    pub enabled: bool,
    pub write_cert_info_to_file: bool,
    pub cert_info_file: PathBuf,
    pub settle_delay: Duration,
}

impl CertificateConfig {
    /// Parses a YAML document holding a top-level `customCertificate` section.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(raw).map_err(|err| {
            CertificateError::configuration(format!("invalid certificate configuration: {err}"))
        })?;
        Ok(file.custom_certificate)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            CertificateError::configuration(format!(
                "failed to read configuration {}: {err}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn build(&self) -> Result<ResolvedConfig> {
        let raw_domain = self
            .certificate_name
            .as_deref()
            .ok_or_else(|| CertificateError::configuration("certificateName is required"))?;
        let domain = normalize_domain(raw_domain)?;

        let region = self
            .region
            .as_deref()
            .map(str::trim)
            .filter(|region| !region.is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_string();

        let mut enabled = parse_enabled(self.enabled.as_ref())?;
        if enabled && UNSUPPORTED_REGIONS.contains(&region.as_str()) {
            warn!("[config] Region {region} is not supported, certificate handling is disabled");
            enabled = false;
        }

        let mut zone_ids = Vec::new();
        for id in self.hosted_zone_id.iter().chain(&self.hosted_zone_ids) {
            let id = normalize_zone_id(id);
            if !id.is_empty() && !zone_ids.contains(&id) {
                zone_ids.push(id);
            }
        }

        let mut zone_names = Vec::new();
        for name in self.hosted_zone_name.iter().chain(&self.hosted_zone_names) {
            let name = normalize_domain(name)?;
            if !zone_names.contains(&name) {
                zone_names.push(name);
            }
        }

        let mut subject_alternative_names: Vec<String> = Vec::new();
        for san in &self.subject_alternative_names {
            let san = normalize_domain(san)?;
            if !subject_alternative_names.contains(&san) {
                subject_alternative_names.push(san);
            }
        }

        let idempotency_token = match self.idempotency_token.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(token) => Some(validate_idempotency_token(token)?),
        };

        let cert_info_file = self
            .cert_info_file_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_CERT_INFO_FILE);

        Ok(ResolvedConfig {
            domain,
            region,
            zone_ids,
            zone_names,
            idempotency_token,
            subject_alternative_names,
            tags: self.tags.clone(),
            rewrite_records: self.rewrite_records,
            enabled,
            write_cert_info_to_file: self.write_cert_info_to_file,
            cert_info_file: PathBuf::from(cert_info_file),
            settle_delay: Duration::from_secs(resolve_env_u64(
                SETTLE_DELAY_ENV,
                DEFAULT_SETTLE_DELAY_SECS,
                true,
            )),
        })
    }
}

impl ResolvedConfig {
    /// Create and delete need at least one zone id or name to work against.
    pub fn require_zones(&self) -> Result<()> {
        if self.zone_ids.is_empty() && self.zone_names.is_empty() {
            return Err(CertificateError::configuration(format!(
                "hostedZoneIds or hostedZoneNames must be set for {}",
                self.domain
            )));
        }
        Ok(())
    }

    pub fn certificate_request(&self) -> CertificateRequest {
        CertificateRequest {
            domain: self.domain.clone(),
            subject_alternative_names: self.subject_alternative_names.clone(),
            idempotency_token: self.idempotency_token.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Names the authority will ask to validate: the domain plus every SAN,
    /// wildcards reduced to their base, without duplicates.
    pub fn validatable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in std::iter::once(&self.domain).chain(&self.subject_alternative_names) {
            let name = validatable_name(name).to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Polling cadence for the wait-until-validated primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationTiming {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl ValidationTiming {
    pub fn from_env() -> Self {
        let attempts = resolve_env_u64(VALIDATION_ATTEMPTS_ENV, DEFAULT_VALIDATION_MAX_ATTEMPTS, false);
        Self {
            poll_interval: Duration::from_secs(resolve_env_u64(
                VALIDATION_POLL_ENV,
                DEFAULT_VALIDATION_POLL_SECS,
                false,
            )),
            max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        }
    }
}

impl Default for ValidationTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_VALIDATION_POLL_SECS),
            max_attempts: DEFAULT_VALIDATION_MAX_ATTEMPTS as u32,
        }
    }
}

fn resolve_env_u64(name: &str, default: u64, allow_zero: bool) -> u64 {
    let Ok(raw) = std::env::var(name) else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(0) if !allow_zero => {
            warn!("[config] {name} must be greater than zero; using default {default}");
            default
        }
        Ok(value) => value,
        Err(_) => {
            warn!("[config] invalid {name} value '{raw}'; using default {default}");
            default
        }
    }
}

fn parse_enabled(value: Option<&serde_yaml::Value>) -> Result<bool> {
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(true),
        Some(serde_yaml::Value::Bool(enabled)) => Ok(*enabled),
        Some(serde_yaml::Value::String(raw)) => match raw.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(CertificateError::configuration(format!(
                "ambiguous enabled flag '{other}', expected true or false"
            ))),
        },
        Some(other) => Err(CertificateError::configuration(format!(
            "ambiguous enabled flag {other:?}, expected true or false"
        ))),
    }
}

fn validate_idempotency_token(token: &str) -> Result<String> {
    let valid = token.len() <= MAX_IDEMPOTENCY_TOKEN_LEN
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(CertificateError::configuration(format!(
            "idempotencyToken '{token}' must be 1-{MAX_IDEMPOTENCY_TOKEN_LEN} word characters"
        )));
    }
    Ok(token.to_string())
}
