//! Error types for the segment_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the segment_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The fact table has no rows to segment
    #[error("Empty input: the fact table has no rows")]
    EmptyInput,

    /// The input contract is missing a required column
    #[error("Missing upstream column: {0}")]
    MissingUpstreamColumn(String),

    /// A segment is too short to hold out a back-test row
    #[error("Insufficient history for segment {key}: {observations} observation(s), need at least 2")]
    InsufficientHistory {
        /// Display form of the segment key
        key: String,
        /// Number of rows the segment had after alignment
        observations: usize,
    },

    /// Model training failed for a segment
    #[error("Model fit failed for segment {key}: {reason}")]
    ModelFit {
        /// Display form of the segment key
        key: String,
        /// What went wrong
        reason: String,
    },

    /// A segment exceeded its fit time budget
    #[error("Model fit for segment {key} exceeded its time budget after {elapsed_ms} ms")]
    FitTimeout {
        /// Display form of the segment key
        key: String,
        /// Time spent before giving up
        elapsed_ms: u64,
    },

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to internal consistency checks
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error while loading configuration
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ForecastError {
    /// Whether the error only affects one segment.
    ///
    /// Segment-local errors are logged and the segment is skipped; everything
    /// else aborts the run.
    pub fn is_segment_local(&self) -> bool {
        matches!(
            self,
            ForecastError::InsufficientHistory { .. }
                | ForecastError::ModelFit { .. }
                | ForecastError::FitTimeout { .. }
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
