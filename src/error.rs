//! Error types for the propval prediction pipeline

use thiserror::Error;

/// Result type alias for propval operations
pub type Result<T> = std::result::Result<T, PropvalError>;

/// Main error type for the prediction pipeline
///
/// Every variant carries enough structured detail to be mapped onto an
/// outer-layer response without re-deriving context.
#[derive(Error, Debug)]
pub enum PropvalError {
    /// A record field is missing, mistyped or outside its declared range
    #[error("Validation error: {field} = {value}, expected {expected}")]
    Validation {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Degenerate base price {base_price}: percentage impact is undefined")]
    DegenerateBase { base_price: f64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict: {0} already exists")]
    VersionConflict(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Training failure: {0}")]
    TrainingFailure(String),

    #[error("Training cancelled between candidate fits")]
    Cancelled,

    #[error("Training exceeded its time limit of {limit_secs}s")]
    Timeout { limit_secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PropvalError {
    /// Shorthand for a validation failure on one field
    pub fn validation(
        field: impl Into<String>,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        PropvalError::Validation {
            field: field.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    /// Field name for validation errors, `None` otherwise
    pub fn field(&self) -> Option<&str> {
        match self {
            PropvalError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PropvalError {
    fn from(err: serde_json::Error) -> Self {
        PropvalError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for PropvalError {
    fn from(err: bincode::Error) -> Self {
        PropvalError::Serialization(err.to_string())
    }
}

impl From<polars::error::PolarsError> for PropvalError {
    fn from(err: polars::error::PolarsError) -> Self {
        PropvalError::Data(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PropvalError {
    fn from(err: ndarray::ShapeError) -> Self {
        PropvalError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = PropvalError::validation("area_sqft", 100.0, "[500, 20000]");
        assert_eq!(
            err.to_string(),
            "Validation error: area_sqft = 100, expected [500, 20000]"
        );
        assert_eq!(err.field(), Some("area_sqft"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PropvalError = io_err.into();
        assert!(matches!(err, PropvalError::Io(_)));
        assert_eq!(err.field(), None);
    }
}
