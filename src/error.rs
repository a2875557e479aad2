use thiserror::Error;

/// Errors raised by the training pipeline.
///
/// Every variant is fatal for the binary; nothing is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read dataset: {0}")]
    DataFrame(#[from] polars::prelude::PolarsError),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid timestamp index in column '{column}': {reason}")]
    InvalidIndex { column: String, reason: String },

    #[error("Column '{column}' is not numeric (found {dtype})")]
    NonNumericColumn { column: String, dtype: String },

    #[error("Column '{column}' has a missing value at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Empty data provided")]
    EmptyData,

    #[error("Model error: {0}")]
    Model(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Tracking store error: {0}")]
    Tracking(String),

    #[error("Plotting error: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<bincode::Error> for PipelineError {
    fn from(e: bincode::Error) -> Self {
        PipelineError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(e: serde_yaml::Error) -> Self {
        PipelineError::Serialization(e.to_string())
    }
}
