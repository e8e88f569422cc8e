//! Error types for the CSI stream engine.
//!
//! Per-record faults never escape the stream controller: a record that the
//! normalizer cannot decode is dropped and logged, while a record that merely
//! carries no usable numbers degrades to an empty subcarrier vector.
//!
//! # Error Hierarchy
//!
//! - [`StreamError`]: top-level error returned by orchestration code
//! - [`NormalizeError`]: structural failures while decoding a raw record
//! - [`ConfigError`]: engine configuration loading and validation
//! - [`SessionError`]: stream session lifecycle failures

use std::path::PathBuf;

use thiserror::Error;

/// A specialized `Result` type for stream engine operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Top-level error type for the stream engine.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    /// Raw record could not be normalized.
    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stream session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Ingestion envelope could not be decoded.
    #[error("Invalid ingestion envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// Structural failures while normalizing a raw record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NormalizeError {
    /// The raw record is not a JSON object.
    #[error("expected a JSON object record, got {kind}")]
    NotAnObject {
        /// JSON kind that was received instead.
        kind: &'static str,
    },
}

/// Errors from loading or validating an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// A field holds a value outside its permitted range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file could not be read or written.
    #[error("failed to access config file {path}: {source}")]
    FileAccess {
        /// Path that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for this schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Creates a new invalid-value error.
    #[must_use]
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Stream session lifecycle failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    /// The session task panicked or was aborted before it could be joined.
    #[error("session task ended abnormally: {0}")]
    Join(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_error_display_names_kind() {
        let err = NormalizeError::NotAnObject { kind: "array" };
        assert_eq!(err.to_string(), "expected a JSON object record, got array");
    }

    #[test]
    fn stream_error_wraps_normalize_error() {
        let err: StreamError = NormalizeError::NotAnObject { kind: "string" }.into();
        assert!(matches!(err, StreamError::Normalize(_)));
        assert!(err.to_string().starts_with("Normalization error"));
    }

    #[test]
    fn stream_error_wraps_config_and_session_errors() {
        let err: StreamError = ConfigError::invalid_value("window_points", "must be > 0").into();
        assert!(matches!(err, StreamError::Config(ConfigError::InvalidValue { .. })));
        assert!(err.to_string().starts_with("Configuration error"));

        let err: StreamError = SessionError::Join("task panicked".into()).into();
        assert!(matches!(err, StreamError::Session(SessionError::Join(_))));
        assert_eq!(err.to_string(), "Session error: session task ended abnormally: task panicked");
    }

    #[test]
    fn config_error_invalid_value() {
        let err = ConfigError::invalid_value("buffer_capacity", "must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid value for `buffer_capacity`: must be > 0"
        );
    }
}
