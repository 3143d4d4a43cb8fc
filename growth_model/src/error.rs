//! Error types for the growth_model crate

use thiserror::Error;

/// Fitting and projection failures surfaced to the pipeline
#[derive(Debug, Error)]
pub enum GrowthModelError {
    /// The saturation bounds cannot support a bounded-growth fit
    #[error("invalid saturation bounds: {0}")]
    Geometry(String),

    /// The series itself cannot be fitted
    #[error("degenerate series: {0}")]
    DegenerateSeries(String),

    /// The solve failed numerically
    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// Result type with the engine error
pub type Result<T> = std::result::Result<T, GrowthModelError>;
