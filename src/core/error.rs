use thiserror::Error;

/// Result alias used across the reconcilers and provider clients.
pub type Result<T> = std::result::Result<T, CertificateError>;

/// Errors produced while provisioning or tearing down a certificate.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// Invalid configuration or a hosted zone setup that cannot cover the
    /// certificate. Raised before any mutating call.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A read-only lookup found nothing. Callers usually resolve this to a
    /// blank value.
    #[error("not found: {0}")]
    NotFound(String),
    /// A certificate authority or DNS service call failed.
    #[error("{operation} failed: {message}")]
    Service { operation: String, message: String },
    /// The result sink could not persist the certificate identifier.
    #[error("result sink error: {0}")]
    ResultSink(String),
}

impl CertificateError {
    pub fn service(operation: &str, message: impl Into<String>) -> Self {
        CertificateError::Service {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        CertificateError::Configuration(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CertificateError::NotFound(_))
    }
}
