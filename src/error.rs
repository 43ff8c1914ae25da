//! Error types for the composable-activity library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum ActivityError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid value '{value}' at row {row}, column {col}")]
    InvalidValue {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate feature identifier '{0}'")]
    DuplicateFeature(String),

    #[error("Duplicate sample identifier '{0}'")]
    DuplicateSample(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error(
        "No features shared between matrices (genomic: {n_genomic} features, activity: {n_activity} features)"
    )]
    EmptyAlignment { n_genomic: usize, n_activity: usize },

    #[error("Sample pairing '{sample}' -> '{paired}' has no '{missing}' column in the {side} matrix")]
    MissingPairing {
        sample: String,
        paired: String,
        missing: String,
        side: &'static str,
    },

    #[error("Normalization check failed: {0}")]
    NormalizationCheck(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, ActivityError>;
