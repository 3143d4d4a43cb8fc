//! End-to-end forecast pipeline: validate, aggregate, fit, post-process

use crate::config::{
    validate_confidence, RegressionConfig, DEFAULT_CHANGEPOINT_PRIOR_SCALE, DEFAULT_CONFIDENCE,
    DEFAULT_SEASONALITY_PRIOR_SCALE,
};
use crate::engine::{FittedRegression, RegressionEngine};
use crate::error::{ForecastError, Result};
use crate::postprocess::{
    clip_to_bounds, merge_actuals, score_accuracy, summarize, AccuracyReport, ForecastSummary,
};
use crate::record::TransactionRecord;
use crate::response::{render_rows, ForecastRow};
use crate::series::aggregate_monthly;

/// Default lower saturation bound for monthly totals
pub const DEFAULT_FLOOR: f64 = 5000.0;

/// Default number of months projected past the end of history
pub const DEFAULT_LOOKAHEAD: usize = 3;

/// Largest lookahead the pipeline will accept
pub const MAX_LOOKAHEAD: usize = 15;

/// Tunable pipeline behavior, fixed at service startup
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Confidence level used when a request does not supply one
    pub default_confidence: f64,
    /// Configured lower saturation bound
    pub floor: f64,
    /// Months projected past the end of history
    pub lookahead_periods: usize,
    /// Trailing months withheld from fitting to score accuracy against
    pub holdout_periods: usize,
    /// Flexibility of the piecewise trend
    pub changepoint_prior_scale: f64,
    /// Strength of the seasonal components
    pub seasonality_prior_scale: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_confidence: DEFAULT_CONFIDENCE,
            floor: DEFAULT_FLOOR,
            lookahead_periods: DEFAULT_LOOKAHEAD,
            holdout_periods: 0,
            changepoint_prior_scale: DEFAULT_CHANGEPOINT_PRIOR_SCALE,
            seasonality_prior_scale: DEFAULT_SEASONALITY_PRIOR_SCALE,
        }
    }
}

impl PipelineSettings {
    /// Check ranges that would otherwise surface as confusing engine
    /// failures later
    pub fn validate(&self) -> Result<()> {
        validate_confidence(self.default_confidence)?;
        if !self.floor.is_finite() {
            return Err(ForecastError::Validation(
                "floor must be a finite number".to_string(),
            ));
        }
        if self.lookahead_periods < 1 || self.lookahead_periods > MAX_LOOKAHEAD {
            return Err(ForecastError::Validation(format!(
                "lookahead must be between 1 and {MAX_LOOKAHEAD} months, got {}",
                self.lookahead_periods
            )));
        }
        if !self.changepoint_prior_scale.is_finite() || self.changepoint_prior_scale <= 0.0 {
            return Err(ForecastError::Validation(
                "changepoint_prior_scale must be positive".to_string(),
            ));
        }
        if !self.seasonality_prior_scale.is_finite() || self.seasonality_prior_scale <= 0.0 {
            return Err(ForecastError::Validation(
                "seasonality_prior_scale must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything produced by one pipeline run
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    /// Wire-format rows in ascending month order
    pub rows: Vec<ForecastRow>,
    /// Accuracy over months that overlap history
    pub accuracy: AccuracyReport,
    /// Headline averages over the window
    pub summary: ForecastSummary,
}

/// The forecast pipeline, generic over the regression engine that fits
/// models
#[derive(Debug, Clone)]
pub struct ForecastPipeline<E: RegressionEngine> {
    engine: E,
    settings: PipelineSettings,
}

impl<E: RegressionEngine> ForecastPipeline<E> {
    /// Build a pipeline, rejecting out-of-range settings up front
    pub fn new(engine: E, settings: PipelineSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { engine, settings })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the full pipeline over validated transactions.
    ///
    /// `confidence` overrides the configured default when supplied.
    /// The returned rows span the training backfill plus the projected
    /// horizon; the horizon is the configured lookahead plus any
    /// holdout months, so withheld history is re-forecast and scored
    /// out-of-sample alongside the in-sample fit.
    pub fn run(
        &self,
        records: &[TransactionRecord],
        confidence: Option<f64>,
    ) -> Result<ForecastOutcome> {
        let confidence = validate_confidence(confidence.unwrap_or(self.settings.default_confidence))?;
        let series = aggregate_monthly(records, self.settings.floor)?;
        tracing::debug!(
            months = series.len(),
            floor = series.floor(),
            cap = series.cap(),
            "aggregated monthly series"
        );

        let training = series.training_slice(self.settings.holdout_periods)?;
        let config = RegressionConfig::monthly(
            confidence,
            self.settings.changepoint_prior_scale,
            self.settings.seasonality_prior_scale,
        )?;

        let fitted = self.engine.fit(training, &config).map_err(|e| {
            tracing::error!(
                engine = self.engine.name(),
                months = training.len(),
                first_month = ?training.first().map(|p| p.period_start),
                last_month = ?training.last().map(|p| p.period_start),
                floor = series.floor(),
                cap = series.cap(),
                error = %e,
                "model fit failed"
            );
            ForecastError::ModelFit(e.to_string())
        })?;

        let horizon = self.settings.holdout_periods + self.settings.lookahead_periods;
        let projected = fitted
            .project(horizon, series.floor(), series.cap())
            .map_err(|e| ForecastError::ModelFit(e.to_string()))?;

        let mut points = clip_to_bounds(projected, series.cap());
        merge_actuals(&mut points, &series);
        let accuracy = score_accuracy(&points);
        let summary = summarize(&points);
        tracing::info!(
            engine = self.engine.name(),
            horizon,
            mape = ?accuracy.mape,
            ci_coverage = ?accuracy.ci_coverage,
            historical_avg = ?summary.historical_avg,
            forecast_avg = ?summary.forecast_avg,
            trend_pct = ?summary.trend_pct,
            "forecast complete"
        );

        Ok(ForecastOutcome {
            rows: render_rows(&points),
            accuracy,
            summary,
        })
    }
}
