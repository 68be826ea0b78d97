//! Error types for the risklab pipeline

use thiserror::Error;

/// Result type alias for risklab operations
pub type Result<T> = std::result::Result<T, RisklabError>;

/// Main error type for the risklab pipeline
#[derive(Error, Debug)]
pub enum RisklabError {
    /// Input could not be parsed into a usable table
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// A named column is absent from the table
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// The table cannot support the requested operation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A prediction input lacks a feature the model was trained on
    #[error("Missing feature: {0}")]
    MissingFeature(String),

    /// A caller-supplied parameter is out of range
    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    /// Array dimensions do not line up
    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    /// Prediction requested before any successful training run
    #[error("Model not trained")]
    NotTrained,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for RisklabError {
    fn from(err: polars::error::PolarsError) -> Self {
        RisklabError::DataFormat(err.to_string())
    }
}
