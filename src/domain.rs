use crate::core::error::{CertificateError, Result};

const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";

/// Canonical ASCII, lower-case form of a domain without the trailing dot.
/// A leading wildcard label is preserved.
pub fn normalize_domain(input: &str) -> Result<String> {
    let trimmed = input.trim().trim_end_matches('.');
    let (wildcard, bare) = match trimmed.strip_prefix("*.") {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    if bare.is_empty() {
        return Err(CertificateError::configuration("domain name is required"));
    }
    let ascii = idna::domain_to_ascii(bare).map_err(|err| {
        CertificateError::configuration(format!("invalid domain name '{input}': {err}"))
    })?;
    let ascii = ascii.to_lowercase();
    Ok(if wildcard { format!("*.{ascii}") } else { ascii })
}

/// The name the authority validates for a domain: wildcards validate their base.
pub fn validatable_name(domain: &str) -> &str {
    domain.strip_prefix("*.").unwrap_or(domain)
}

/// Record names are compared case-insensitively without the trailing dot.
pub fn normalize_record_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

pub fn normalize_zone_id(id: &str) -> String {
    let trimmed = id.trim();
    trimmed
        .strip_prefix(HOSTED_ZONE_PREFIX)
        .unwrap_or(trimmed)
        .to_string()
}

/// True when `zone_name` is `domain` itself or one of its parents.
pub fn matches_zone(domain: &str, zone_name: &str) -> bool {
    let domain = match normalize_domain(domain) {
        Ok(value) => value,
        Err(_) => return false,
    };
    let zone_name = match normalize_domain(zone_name) {
        Ok(value) => value,
        Err(_) => return false,
    };
    let domain = validatable_name(&domain);
    domain == zone_name || domain.ends_with(&format!(".{zone_name}"))
}
