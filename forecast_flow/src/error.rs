//! Error types for the forecast_flow crate

use thiserror::Error;

/// Custom error types for the forecast_flow crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Input failed validation (malformed dates, non-finite amounts,
    /// out-of-range parameters)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not enough monthly history to fit a model
    #[error("Insufficient history: at least {required} monthly totals are required, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// The regression engine rejected the series or failed to converge
    #[error("Model fit failure: {0}")]
    ModelFit(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
