use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;

use log::{debug, info};

use crate::core::config::ResolvedConfig;
use crate::core::error::{CertificateError, Result};
use crate::core::types::CertificateResult;

/// Destination for the identifier of a provisioned certificate.
pub trait ResultSink: Send + Sync + Debug {
    fn persist(&self, result: &CertificateResult) -> Result<()>;
}

/// Sink that only logs the result.
#[derive(Debug, Default)]
pub struct NoopSink;

impl ResultSink for NoopSink {
    fn persist(&self, result: &CertificateResult) -> Result<()> {
        debug!(
            "[result-sink] Certificate {} for {} not persisted",
            result.certificate_arn, result.domain
        );
        Ok(())
    }
}

/// Writes the result as a YAML document.
#[derive(Debug, Clone)]
pub struct YamlFileSink {
    path: PathBuf,
}

impl YamlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for YamlFileSink {
    fn persist(&self, result: &CertificateResult) -> Result<()> {
        let yaml = serde_yaml::to_string(result)
            .map_err(|e| CertificateError::ResultSink(format!("failed to serialize result: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                CertificateError::ResultSink(format!(
                    "failed to create {}: {e}",
                    parent.display()
                ))
            })?;
        }

        fs::write(&self.path, yaml).map_err(|e| {
            CertificateError::ResultSink(format!(
                "failed to write {}: {e}",
                self.path.display()
            ))
        })?;

        info!(
            "[result-sink] Wrote certificate info for {} to {}",
            result.domain,
            self.path.display()
        );
        Ok(())
    }
}

/// Picks the sink requested by the configuration.
pub fn select_sink(config: &ResolvedConfig) -> Box<dyn ResultSink> {
    if config.write_cert_info_to_file {
        Box::new(YamlFileSink::new(config.cert_info_file.clone()))
    } else {
        Box::new(NoopSink)
    }
}
