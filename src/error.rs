//! Error types for the practicum service layer
//!
//! This module provides structured error handling using thiserror for the
//! library and anyhow for propagation at the binary boundary.

use thiserror::Error;

/// Main error type for practicum operations
#[derive(Error, Debug)]
pub enum PracticumError {
    /// Bad input to a write (length, range or shape check)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required identity was absent or blank
    #[error("Missing identifier: {0}")]
    MissingIdentifier(String),

    /// Attempted mutation of the protected sentinel record
    #[error("Protected record: {0}")]
    ProtectedRecord(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reading from the document store failed
    #[error("Store read error: {0}")]
    StoreRead(String),

    /// Writing to the document store failed
    #[error("Store write error: {0}")]
    StoreWrite(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for practicum operations
pub type Result<T> = std::result::Result<T, PracticumError>;

impl From<config::ConfigError> for PracticumError {
    fn from(err: config::ConfigError) -> Self {
        PracticumError::Config(err.to_string())
    }
}

/// Convert anyhow::Error to PracticumError
impl From<anyhow::Error> for PracticumError {
    fn from(err: anyhow::Error) -> Self {
        PracticumError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PracticumError::NotFound("student 42".to_string());
        assert_eq!(err.to_string(), "Not found: student 42");

        let err = PracticumError::ProtectedRecord("999999".to_string());
        assert_eq!(err.to_string(), "Protected record: 999999");
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err: PracticumError = json_err.into();
        assert!(matches!(err, PracticumError::Serialization(_)));

        let err: PracticumError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, PracticumError::Other(ref m) if m == "boom"));
    }
}
