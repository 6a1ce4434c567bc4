//! Error types for the disposition classifier

use thiserror::Error;

/// Result type alias for classifier operations
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Main error type for the classifier
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Bad or absent target column, empty feature set, no usable rows
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Transform requested before the pipeline was fitted
    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unknown label: '{0}' was not seen during fit")]
    UnknownLabel(String),

    #[error("Label index {index} out of range for {n_classes} classes")]
    LabelIndexOutOfRange { index: usize, n_classes: usize },

    #[error("Model not trained")]
    NotTrained,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("No trained model available{0}")]
    NoModel(String),

    /// A single record carries a value that cannot be used for its column
    #[error("Invalid value for '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ClassifierError {
    /// Whether the error was caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ClassifierError::SchemaError(_)
                | ClassifierError::DimensionMismatch { .. }
                | ClassifierError::UnknownLabel(_)
                | ClassifierError::UnsupportedFormat(_)
                | ClassifierError::NoModel(_)
                | ClassifierError::InvalidValue { .. }
                | ClassifierError::InvalidParameter { .. }
                | ClassifierError::DataError(_)
        )
    }
}

impl From<polars::error::PolarsError> for ClassifierError {
    fn from(err: polars::error::PolarsError) -> Self {
        ClassifierError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ClassifierError {
    fn from(err: ndarray::ShapeError) -> Self {
        ClassifierError::DataError(format!("ndarray shape error: {}", err))
    }
}

impl From<calamine::Error> for ClassifierError {
    fn from(err: calamine::Error) -> Self {
        ClassifierError::DataError(format!("spreadsheet error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClassifierError::DimensionMismatch { expected: 12, actual: 9 };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 12 features, got 9");

        let err = ClassifierError::NoModel(" for user 'alice'".to_string());
        assert_eq!(err.to_string(), "No trained model available for user 'alice'");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(ClassifierError::SchemaError("no target".into()).is_client_error());
        assert!(ClassifierError::UnsupportedFormat(".txt".into()).is_client_error());
        assert!(!ClassifierError::NotTrained.is_client_error());
        assert!(!ClassifierError::TrainingError("diverged".into()).is_client_error());
    }

    #[test]
    fn test_from_serde_json() {
        let err: ClassifierError = serde_json::from_str::<u32>("oops").unwrap_err().into();
        assert!(matches!(err, ClassifierError::SerializationError(_)));
    }
}
