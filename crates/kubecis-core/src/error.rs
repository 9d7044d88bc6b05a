//! Error types for kubecis

use thiserror::Error;

/// Result type alias using kubecis Error
pub type Result<T> = std::result::Result<T, Error>;

/// kubecis error types
#[derive(Error, Debug)]
pub enum Error {
    // === Document Load Errors ===
    #[error("Benchmark document not found: {path}")]
    DocumentNotFound { path: String },

    #[error("YAML file is empty or invalid: {path}")]
    EmptyDocument { path: String },

    #[error("Invalid benchmark document: {path} - {message}")]
    InvalidDocument { path: String, message: String },

    // === Evaluation Errors ===
    #[error("Invalid match pattern for {target}: {message}")]
    InvalidPattern { target: String, message: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    // === Report Errors ===
    #[error("Could not load results from {path}: {message}")]
    ResultsUnavailable { path: String, message: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors that belong to a single benchmark document and must not stop the batch
    pub fn is_document_scoped(&self) -> bool {
        matches!(
            self,
            Error::DocumentNotFound { .. }
                | Error::EmptyDocument { .. }
                | Error::InvalidDocument { .. }
        )
    }

    /// Check if this error is fatal (should stop the run)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::InvalidConfig { .. }
        )
    }

    /// Get an error code for logging
    pub fn code(&self) -> &'static str {
        match self {
            Error::DocumentNotFound { .. } => "DOCUMENT_NOT_FOUND",
            Error::EmptyDocument { .. } => "EMPTY_DOCUMENT",
            Error::InvalidDocument { .. } => "INVALID_DOCUMENT",
            Error::InvalidPattern { .. } => "INVALID_PATTERN",
            Error::Configuration(_) => "CONFIG_ERROR",
            Error::InvalidConfig { .. } => "INVALID_CONFIG",
            Error::ResultsUnavailable { .. } => "RESULTS_UNAVAILABLE",
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_errors_are_scoped() {
        let err = Error::EmptyDocument {
            path: "cis-1.11/master.yaml".into(),
        };
        assert!(err.is_document_scoped());
        assert!(!err.is_fatal());
        assert_eq!(err.code(), "EMPTY_DOCUMENT");
        assert_eq!(
            err.to_string(),
            "YAML file is empty or invalid: cis-1.11/master.yaml"
        );
    }

    #[test]
    fn test_config_errors_are_fatal() {
        let err = Error::InvalidConfig {
            key: "audit.command_timeout_seconds".into(),
            message: "must be greater than zero".into(),
        };
        assert!(err.is_fatal());
        assert!(!err.is_document_scoped());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Error::InvalidPattern {
            target: "--audit-log-maxage".into(),
            message: "compiled regex exceeds size limit".into(),
        };
        assert_eq!(err.code(), "INVALID_PATTERN");
        assert!(!err.is_document_scoped());
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Invalid match pattern for --audit-log-maxage: compiled regex exceeds size limit"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
