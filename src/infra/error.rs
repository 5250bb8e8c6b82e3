//! Error types for invoice parsing and signature verification.
//! Error handling types and result definitions shared across the crate.

use thiserror::Error;

use crate::domain::invoice::Provider;

/// Result type for parsing and verification operations
pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// Comprehensive error types for invoice processing and trust operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum ProcessorError {
    #[error("no signature found in document")]
    NoSignature,

    #[error("signature validation failed: {0}")]
    InvalidSignature(String),

    #[error("certificate expired: {0}")]
    CertExpired(String),

    #[error("certificate not yet valid: {0}")]
    CertNotYetValid(String),

    #[error("certificate revoked: {0}")]
    CertRevoked(String),

    #[error("certificate chain validation failed: {0}")]
    ChainInvalid(String),

    #[error("root CA not trusted: {0}")]
    UntrustedRoot(String),

    #[error("OCSP check unavailable: {0}")]
    OcspUnavailable(String),

    #[error("timestamp verification failed: {0}")]
    TimestampInvalid(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("external tool not available: {0}")]
    ToolUnavailable(String),

    #[error("[{provider}] {field}: {message}")]
    Parse {
        provider: Provider,
        field: String,
        message: String,
    },

    #[error("validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ProcessorError {
    /// Create a parse error with provider and field context
    pub fn parse(provider: Provider, field: &str, message: impl Into<String>) -> Self {
        ProcessorError::Parse {
            provider,
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for each error class
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ProcessorError::NoSignature => "NO_SIGNATURE",
            ProcessorError::InvalidSignature(_) => "INVALID_SIGNATURE",
            ProcessorError::CertExpired(_) => "CERT_EXPIRED",
            ProcessorError::CertNotYetValid(_) => "CERT_NOT_YET_VALID",
            ProcessorError::CertRevoked(_) => "CERT_REVOKED",
            ProcessorError::ChainInvalid(_) => "CHAIN_INVALID",
            ProcessorError::UntrustedRoot(_) => "UNTRUSTED_ROOT",
            ProcessorError::OcspUnavailable(_) => "OCSP_UNAVAILABLE",
            ProcessorError::TimestampInvalid(_) => "TIMESTAMP_INVALID",
            ProcessorError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ProcessorError::ToolUnavailable(_) => "TOOL_UNAVAILABLE",
            ProcessorError::Parse { .. } => "PARSE_ERROR",
            ProcessorError::Validation { .. } => "VALIDATION_ERROR",
            ProcessorError::Xml(_) => "XML_ERROR",
            ProcessorError::Certificate(_) => "CERTIFICATE_ERROR",
            ProcessorError::Io(_) => "IO_ERROR",
            ProcessorError::Network(_) => "NETWORK_ERROR",
            ProcessorError::InvalidInput(_) => "INVALID_INPUT",
            ProcessorError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<std::io::Error> for ProcessorError {
    fn from(error: std::io::Error) -> Self {
        ProcessorError::Io(error.to_string())
    }
}

impl From<reqwest::Error> for ProcessorError {
    fn from(error: reqwest::Error) -> Self {
        ProcessorError::Network(error.to_string())
    }
}

impl From<quick_xml::Error> for ProcessorError {
    fn from(error: quick_xml::Error) -> Self {
        ProcessorError::Xml(error.to_string())
    }
}
