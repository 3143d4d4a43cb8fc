//! Seam between the pipeline and the regression engine that fits models

use crate::config::RegressionConfig;
use crate::series::MonthlyPoint;
use chrono::NaiveDate;
use std::fmt::Debug;

/// One projected month as produced by a fitted model, before any
/// post-processing
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPoint {
    /// First day of the projected month
    pub period_start: NaiveDate,
    /// Central estimate
    pub point_estimate: f64,
    /// Lower edge of the forecast interval
    pub lower_bound: f64,
    /// Upper edge of the forecast interval
    pub upper_bound: f64,
}

/// A model fitted to a monthly series
pub trait FittedRegression: Debug {
    /// Engine-specific failure type
    type Error: std::error::Error + Send + Sync + 'static;

    /// Produce the projected frame: an in-sample estimate for every
    /// training month (the backfill), followed by `horizon` months past
    /// the end of the training series at monthly cadence.
    ///
    /// Implementations receive the saturation bounds the series was
    /// aggregated with and must return points in ascending
    /// `period_start` order.
    fn project(
        &self,
        horizon: usize,
        floor: f64,
        cap: f64,
    ) -> std::result::Result<Vec<ProjectedPoint>, Self::Error>;
}

/// A regression engine that fits bounded-growth seasonal models
pub trait RegressionEngine: Debug {
    /// The fitted model type produced
    type Fitted: FittedRegression<Error = Self::Error>;

    /// Engine-specific failure type
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fit a model to an ascending, deduplicated monthly series
    fn fit(
        &self,
        training: &[MonthlyPoint],
        config: &RegressionConfig,
    ) -> std::result::Result<Self::Fitted, Self::Error>;

    /// Name of the engine used in diagnostics
    fn name(&self) -> &str;
}
