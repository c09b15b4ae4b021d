use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_acm::Client;
use aws_sdk_acm::error::DisplayErrorContext;
use aws_sdk_acm::types::{Tag, ValidationMethod};
use log::{debug, info};

use super::CertificateAuthority;
use crate::core::config::ValidationTiming;
use crate::core::error::{CertificateError, Result};
use crate::core::types::{
    CertificatePage, CertificateRecord, CertificateRequest, CertificateStatus, CertificateSummary,
    TagSet, ValidationOption,
};
use crate::issuance::retry::poll_until;

/// Statuses from which a certificate never reaches ISSUED.
const TERMINAL_FAILURE_STATUSES: &[&str] = &[
    "FAILED",
    "VALIDATION_TIMED_OUT",
    "REVOKED",
    "EXPIRED",
    "INACTIVE",
];

/// AWS Certificate Manager client.
pub struct AcmAuthority {
    client: Client,
    region: String,
    timing: ValidationTiming,
}

impl std::fmt::Debug for AcmAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcmAuthority")
            .field("region", &self.region)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl AcmAuthority {
    pub fn new(sdk_config: &SdkConfig, timing: ValidationTiming) -> Self {
        let region = sdk_config
            .region()
            .map(|region| region.to_string())
            .unwrap_or_default();
        Self {
            client: Client::new(sdk_config),
            region,
            timing,
        }
    }

    /// Builds a client for `region` from the default credential chain.
    pub async fn connect(region: &str, timing: ValidationTiming) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(&sdk_config, timing)
    }

    fn tags_to_sdk(tags: &TagSet) -> Result<Vec<Tag>> {
        tags.iter()
            .map(|(key, value)| {
                Tag::builder()
                    .key(key)
                    .value(value)
                    .build()
                    .map_err(|e| CertificateError::service("acm.build_tag", e.to_string()))
            })
            .collect()
    }

    /// Tags attached to the request itself; `None` when there are none.
    fn request_tags(request: &CertificateRequest) -> Result<Option<Vec<Tag>>> {
        if request.tags.is_empty() {
            return Ok(None);
        }
        Self::tags_to_sdk(&request.tags).map(Some)
    }
}

fn sdk_error<E>(operation: &str, err: E) -> CertificateError
where
    E: std::error::Error + 'static,
{
    CertificateError::service(operation, DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl CertificateAuthority for AcmAuthority {
    async fn list_certificates(&self, next_token: Option<String>) -> Result<CertificatePage> {
        let output = self
            .client
            .list_certificates()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| sdk_error("acm.list_certificates", e))?;

        let certificates = output
            .certificate_summary_list()
            .iter()
            .filter_map(|summary| {
                Some(CertificateSummary {
                    arn: summary.certificate_arn()?.to_string(),
                    domain_name: summary.domain_name()?.to_string(),
                })
            })
            .collect();

        Ok(CertificatePage {
            certificates,
            next_token: output
                .next_token()
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        })
    }

    async fn request_certificate(&self, request: &CertificateRequest) -> Result<String> {
        let sans = (!request.subject_alternative_names.is_empty())
            .then(|| request.subject_alternative_names.clone());

        let output = self
            .client
            .request_certificate()
            .domain_name(&request.domain)
            .validation_method(ValidationMethod::Dns)
            .set_subject_alternative_names(sans)
            .set_idempotency_token(request.idempotency_token.clone())
            .set_tags(Self::request_tags(request)?)
            .send()
            .await
            .map_err(|e| sdk_error("acm.request_certificate", e))?;

        let arn = output.certificate_arn().ok_or_else(|| {
            CertificateError::service(
                "acm.request_certificate",
                "response did not contain a certificate ARN",
            )
        })?;
        info!("[acm] Requested certificate {} in {}", arn, self.region);
        Ok(arn.to_string())
    }

    async fn describe_certificate(&self, arn: &str) -> Result<CertificateRecord> {
        let output = self
            .client
            .describe_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .is_some_and(|err| err.is_resource_not_found_exception());
                if missing {
                    CertificateError::NotFound(format!("certificate {arn}"))
                } else {
                    sdk_error("acm.describe_certificate", e)
                }
            })?;

        let detail = output.certificate().ok_or_else(|| {
            CertificateError::NotFound(format!("certificate {arn} has no detail"))
        })?;

        let validation_options = detail
            .domain_validation_options()
            .iter()
            .filter_map(|validation| {
                let record = validation.resource_record()?;
                Some(ValidationOption {
                    domain_name: validation.domain_name().to_string(),
                    record_name: record.name().to_string(),
                    record_value: record.value().to_string(),
                    record_type: record.r#type().as_str().to_string(),
                })
            })
            .collect();

        Ok(CertificateRecord {
            arn: detail.certificate_arn().unwrap_or(arn).to_string(),
            domain_name: detail.domain_name().unwrap_or_default().to_string(),
            status: detail
                .status()
                .map(|status| CertificateStatus::from_authority(status.as_str()))
                .unwrap_or_else(|| CertificateStatus::Other("UNKNOWN".to_string())),
            subject_alternative_names: detail.subject_alternative_names().to_vec(),
            validation_options,
        })
    }

    async fn delete_certificate(&self, arn: &str) -> Result<()> {
        self.client
            .delete_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_error("acm.delete_certificate", e))?;
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> Result<TagSet> {
        let output = self
            .client
            .list_tags_for_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_error("acm.list_tags_for_certificate", e))?;

        Ok(output
            .tags()
            .iter()
            .map(|tag| {
                (
                    tag.key().to_string(),
                    tag.value().unwrap_or_default().to_string(),
                )
            })
            .collect())
    }

    async fn add_tags(&self, arn: &str, tags: &TagSet) -> Result<()> {
        self.client
            .add_tags_to_certificate()
            .certificate_arn(arn)
            .set_tags(Some(Self::tags_to_sdk(tags)?))
            .send()
            .await
            .map_err(|e| sdk_error("acm.add_tags_to_certificate", e))?;
        Ok(())
    }

    async fn remove_tags(&self, arn: &str, tags: &TagSet) -> Result<()> {
        self.client
            .remove_tags_from_certificate()
            .certificate_arn(arn)
            .set_tags(Some(Self::tags_to_sdk(tags)?))
            .send()
            .await
            .map_err(|e| sdk_error("acm.remove_tags_from_certificate", e))?;
        Ok(())
    }

    async fn wait_until_validated(&self, arn: &str) -> Result<()> {
        poll_until(
            arn,
            "acm.wait_until_validated",
            self.timing.poll_interval,
            self.timing.max_attempts,
            || async move {
                let record = self.describe_certificate(arn).await?;
                debug!("[acm] {} status {}", arn, record.status);
                match record.status {
                    CertificateStatus::Issued => Ok(true),
                    CertificateStatus::PendingValidation => Ok(false),
                    ref status if TERMINAL_FAILURE_STATUSES.contains(&status.as_str()) => {
                        Err(CertificateError::service(
                            "acm.wait_until_validated",
                            format!("certificate {arn} ended in status {status}"),
                        ))
                    }
                    _ => Ok(false),
                }
            },
        )
        .await
    }
}
