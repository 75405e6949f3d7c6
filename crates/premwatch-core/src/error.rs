use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy recorded on outcomes and diagnostics.
///
/// Only [`ErrorKind::ConfigurationError`] is fatal to a run; every other kind
/// is absorbed at record or strategy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Timeout, connection error, or non-success HTTP status.
    NetworkFailure,
    /// Anti-automation defence detected. Not retried; cooled down next run.
    BlockedByTarget,
    /// Structure not recognized or AI response malformed.
    ParseFailure,
    /// A single record failed shape checks and was dropped.
    ValidationFailure,
    /// Missing collaborator credential or endpoint.
    ConfigurationError,
}

impl ErrorKind {
    /// Whether a strategy that failed with this kind may be retried in the same run.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::NetworkFailure)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::BlockedByTarget => "blocked_by_target",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::ConfigurationError => "configuration_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read targets file {path}: {source}")]
    TargetsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse targets file: {0}")]
    TargetsFileParse(#[source] serde_yaml::Error),

    #[error("failed to read risk weights file {path}: {source}")]
    WeightsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse risk weights file: {0}")]
    WeightsFileParse(#[source] serde_yaml::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl ConfigError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ConfigurationError
    }
}

/// Raised when a raw licence record cannot be constructed or fails
/// normalization checks.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("record is missing {field}")]
    MissingField { field: &'static str },

    #[error("rejected record \"{business_name}\": {reason}")]
    Rejected {
        business_name: String,
        reason: String,
    },
}

impl RecordError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ValidationFailure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_failure_is_retryable() {
        assert!(ErrorKind::NetworkFailure.is_retryable());
        assert!(!ErrorKind::BlockedByTarget.is_retryable());
        assert!(!ErrorKind::ParseFailure.is_retryable());
        assert!(!ErrorKind::ValidationFailure.is_retryable());
        assert!(!ErrorKind::ConfigurationError.is_retryable());
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::BlockedByTarget).unwrap();
        assert_eq!(json, "\"blocked_by_target\"");
    }

    #[test]
    fn config_error_is_configuration_kind() {
        let err = ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string());
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }
}
