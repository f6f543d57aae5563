//! Error types for healthfold
//!
//! The aggregator never fails. These errors belong to the surfaces around it:
//! payload parsing, configuration, provider reads and the FFI boundary.

use thiserror::Error;

/// Errors raised outside the pure aggregation step
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// Failure of a single read against a health data provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Permission denied for {0}")]
    PermissionDenied(String),

    #[error("Health data provider unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to read {kind}: {message}")]
    Read { kind: String, message: String },
}

impl SourceError {
    pub fn read(kind: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Read {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
