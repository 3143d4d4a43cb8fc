//! Regression configuration for bounded-growth seasonal models

use crate::error::{ForecastError, Result};

/// Default confidence level for forecast intervals
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Default flexibility of the piecewise trend
pub const DEFAULT_CHANGEPOINT_PRIOR_SCALE: f64 = 0.1;

/// Default strength of the seasonal components
pub const DEFAULT_SEASONALITY_PRIOR_SCALE: f64 = 4.0;

/// Period lengths in days for the standard seasonal terms
pub const YEARLY_PERIOD_DAYS: f64 = 365.25;
pub const MONTHLY_PERIOD_DAYS: f64 = 30.5;
pub const QUARTERLY_PERIOD_DAYS: f64 = 91.25;

/// Shape of the long-run trend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthMode {
    /// Unbounded straight trend
    Linear,
    /// Saturating trend bounded by a floor and cap
    Logistic,
}

/// How seasonal effects combine with the trend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonalityMode {
    /// Seasonal effect added to the trend
    Additive,
    /// Seasonal effect scales the trend
    Multiplicative,
}

/// One periodic component expressed as a Fourier expansion
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalTerm {
    /// Component name used in diagnostics
    pub name: String,
    /// Cycle length in days
    pub period_days: f64,
    /// Number of Fourier harmonics; `None` leaves the choice to the engine
    pub fourier_order: Option<usize>,
}

impl SeasonalTerm {
    pub fn new(name: &str, period_days: f64, fourier_order: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            period_days,
            fourier_order,
        }
    }
}

/// Full configuration handed to a regression engine
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionConfig {
    /// Trend shape
    pub growth: GrowthMode,
    /// Seasonality composition mode
    pub seasonality_mode: SeasonalityMode,
    /// Enabled periodic components
    pub seasonal_terms: Vec<SeasonalTerm>,
    /// Flexibility of the piecewise trend
    pub changepoint_prior_scale: f64,
    /// Strength of the seasonal components
    pub seasonality_prior_scale: f64,
    /// Width of the forecast interval, equal to the confidence level
    pub interval_width: f64,
}

impl RegressionConfig {
    /// Standard configuration for monthly cash-flow series: logistic
    /// growth, multiplicative seasonality and yearly, monthly and
    /// quarterly components.
    ///
    /// The yearly component leaves its Fourier order to the engine;
    /// monthly and quarterly cycles are short relative to the yearly
    /// one and use reduced orders.
    pub fn monthly(
        confidence: f64,
        changepoint_prior_scale: f64,
        seasonality_prior_scale: f64,
    ) -> Result<Self> {
        let interval_width = validate_confidence(confidence)?;
        validate_prior_scale("changepoint_prior_scale", changepoint_prior_scale)?;
        validate_prior_scale("seasonality_prior_scale", seasonality_prior_scale)?;

        Ok(Self {
            growth: GrowthMode::Logistic,
            seasonality_mode: SeasonalityMode::Multiplicative,
            seasonal_terms: vec![
                SeasonalTerm::new("yearly", YEARLY_PERIOD_DAYS, None),
                SeasonalTerm::new("monthly", MONTHLY_PERIOD_DAYS, Some(5)),
                SeasonalTerm::new("quarterly", QUARTERLY_PERIOD_DAYS, Some(3)),
            ],
            changepoint_prior_scale,
            seasonality_prior_scale,
            interval_width,
        })
    }

    /// Standard monthly configuration with default prior scales
    pub fn monthly_with_defaults(confidence: f64) -> Result<Self> {
        Self::monthly(
            confidence,
            DEFAULT_CHANGEPOINT_PRIOR_SCALE,
            DEFAULT_SEASONALITY_PRIOR_SCALE,
        )
    }
}

/// Check a confidence level lies in `(0, 1]`
pub fn validate_confidence(level: f64) -> Result<f64> {
    if !level.is_finite() || level <= 0.0 || level > 1.0 {
        return Err(ForecastError::Validation(format!(
            "confidence level must be in (0, 1], got {level}"
        )));
    }
    Ok(level)
}

fn validate_prior_scale(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ForecastError::Validation(format!(
            "{name} must be a positive number, got {value}"
        )));
    }
    Ok(())
}
