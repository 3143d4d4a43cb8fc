//! # Growth Model
//!
//! A regression engine for monthly cash-flow series. Fits a
//! piecewise-linear trend through a logistic link so forecasts saturate
//! between a floor and cap, layers Fourier seasonality on top, and
//! projects a full frame: in-sample estimates for every training month
//! plus future months, with intervals simulated from future trend
//! shifts and residual noise.
//!
//! ## Features
//!
//! - Logistic (saturating) and linear growth
//! - Multiplicative or additive Fourier seasonality
//! - Changepoint grid over the first 80% of history with a
//!   ridge-approximated sparsity prior
//! - Interval estimation via simulated trend shifts and residual noise,
//!   deterministic under a fixed seed
//!
//! The engine plugs into `forecast_flow` through its
//! [`RegressionEngine`](forecast_flow::engine::RegressionEngine) seam:
//!
//! ```rust
//! use forecast_flow::{ForecastPipeline, PipelineSettings};
//! use growth_model::SeasonalCurve;
//!
//! let pipeline = ForecastPipeline::new(SeasonalCurve::new(), PipelineSettings::default());
//! assert!(pipeline.is_ok());
//! ```

pub mod curve;
pub mod design;
pub mod error;
pub mod solver;

// Re-export commonly used types
pub use crate::curve::{FittedSeasonalCurve, SeasonalCurve};
pub use crate::error::{GrowthModelError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
