//! # Forecast Flow
//!
//! A Rust library for monthly cash-flow forecasting. Transactions are
//! aggregated into a monthly series with saturation bounds, handed to a
//! pluggable regression engine, and the projections are post-processed
//! into client-ready rows with accuracy diagnostics.
//!
//! ## Features
//!
//! - Transaction validation for JSON payloads and CSV imports
//! - Calendar-month aggregation with a dynamic cap and configurable floor
//! - Bounded-growth seasonal model configuration (yearly, monthly and
//!   quarterly components)
//! - Engine seam via the [`RegressionEngine`] trait
//! - Clipping, actuals merging, MAPE and interval-coverage scoring
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use forecast_flow::record::TransactionRecord;
//! use forecast_flow::series::aggregate_monthly;
//!
//! let records: Vec<TransactionRecord> = (1..=6)
//!     .map(|month| {
//!         let date = NaiveDate::from_ymd_opt(2024, month, 15).unwrap();
//!         TransactionRecord::new(date, 1000.0 + 100.0 * month as f64)
//!     })
//!     .collect();
//!
//! let series = aggregate_monthly(&records, 0.0).unwrap();
//! assert_eq!(series.len(), 6);
//! assert!((series.cap() - 1600.0 * 1.2).abs() < 1e-9);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod postprocess;
pub mod record;
pub mod response;
pub mod series;

// Re-export commonly used types
pub use crate::config::RegressionConfig;
pub use crate::engine::{FittedRegression, ProjectedPoint, RegressionEngine};
pub use crate::error::{ForecastError, Result};
pub use crate::pipeline::{ForecastOutcome, ForecastPipeline, PipelineSettings};
pub use crate::postprocess::{AccuracyReport, ForecastPoint, ForecastSummary};
pub use crate::record::{TransactionDraft, TransactionRecord};
pub use crate::response::ForecastRow;
pub use crate::series::{MonthlyPoint, MonthlySeries};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
