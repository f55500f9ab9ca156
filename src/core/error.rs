//! Error types for the devease engine.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias using devease's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an analysis request.
///
/// Degraded-but-usable conditions (partial parses, abstaining predictions)
/// are not errors; they travel inside the analysis result as data.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// No supported grammar matches the input.
    #[error("Unsupported language: {hint}")]
    UnsupportedLanguage { hint: String },

    /// A bounded stage exceeded its budget.
    #[error("{stage} timed out after {}ms", budget.as_millis())]
    Timeout {
        stage: &'static str,
        budget: Duration,
    },

    /// Input exceeds a configured size limit.
    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unexpected defect inside the engine.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an unsupported-language error.
    pub fn unsupported(hint: impl Into<String>) -> Self {
        Self::UnsupportedLanguage { hint: hint.into() }
    }

    /// Create a timeout error for the named stage.
    pub fn timeout(stage: &'static str, budget: Duration) -> Self {
        Self::Timeout { stage, budget }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::Serialization(_) | Self::Internal(_) => "internal_error",
            Self::FileNotFound { .. } => "file_not_found",
            Self::UnsupportedLanguage { .. } => "unsupported_language",
            Self::Timeout { .. } => "timeout",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Config(_) | Self::Toml(_) => "config_error",
            Self::InvalidArgument(_) => "invalid_argument",
        }
    }

    /// Whether the caller may retry with a smaller or simplified input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unsupported("notes.txt");
        assert_eq!(err.to_string(), "Unsupported language: notes.txt");

        let err = Error::FileNotFound {
            path: PathBuf::from("test.py"),
        };
        assert_eq!(err.to_string(), "File not found: test.py");
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::timeout("parse", Duration::from_millis(250));
        assert_eq!(err.to_string(), "parse timed out after 250ms");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::unsupported("x").kind(), "unsupported_language");
        assert_eq!(Error::internal("boom").kind(), "internal_error");
        assert_eq!(
            Error::InvalidArgument("missing".into()).kind(),
            "invalid_argument"
        );
        assert!(!Error::internal("boom").is_retryable());
    }
}
