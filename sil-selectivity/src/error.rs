//! Error types for sil-selectivity

use thiserror::Error;

/// Result type for sil-selectivity operations
pub type Result<T> = std::result::Result<T, SelectivityError>;

/// sil-selectivity error types
#[derive(Error, Debug)]
pub enum SelectivityError {
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Unknown category: [{}]", .0.join(", "))]
    UnknownCategory(Vec<String>),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Stale artifact: {0}")]
    StaleArtifact(String),
}

impl SelectivityError {
    pub(crate) fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        SelectivityError::Shape {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<std::io::Error> for SelectivityError {
    fn from(err: std::io::Error) -> Self {
        SelectivityError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SelectivityError {
    fn from(err: serde_json::Error) -> Self {
        SelectivityError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_category_lists_every_name() {
        let err = SelectivityError::UnknownCategory(vec!["foo".into(), "bar".into()]);
        assert_eq!(err.to_string(), "Unknown category: [foo, bar]");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SelectivityError = io.into();
        assert!(matches!(err, SelectivityError::Storage(_)));
    }
}
