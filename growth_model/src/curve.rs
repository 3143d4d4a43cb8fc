//! The bounded-growth seasonal curve and its fitting procedure
//!
//! The trend is a piecewise-linear curve passed through a logistic link
//! so it saturates between the series floor and cap. Seasonality is a
//! ridge-penalized Fourier regression layered on top, multiplicatively
//! or additively. The two parts are estimated by alternating
//! least-squares passes; the Laplace changepoint prior is approximated
//! by its Gaussian counterpart so every pass stays a closed-form solve,
//! with the penalty scaling as `1 / prior_scale²`.

use crate::design::{changepoint_grid, trend_row, SeasonalBasis, TimeScale, CHANGEPOINT_RANGE};
use crate::error::{GrowthModelError, Result};
use crate::solver::ridge_solve;
use chrono::NaiveDate;
use forecast_flow::config::{GrowthMode, RegressionConfig, SeasonalityMode};
use forecast_flow::engine::{FittedRegression, ProjectedPoint, RegressionEngine};
use forecast_flow::series::{add_months, MonthlyPoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};
use statrs::distribution::{ContinuousCDF, Normal as Gaussian};

/// Simulated trajectories used for forecast intervals
pub const DEFAULT_SIMULATION_PATHS: usize = 500;

/// Fixed seed so identical inputs produce identical forecasts
pub const DEFAULT_SIMULATION_SEED: u64 = 42;

/// Alternating trend/seasonality estimation passes
const BACKFIT_ROUNDS: usize = 3;

/// Band kept away from the logistic asymptotes when transforming
/// observations
const LOGIT_EPS: f64 = 1e-6;

/// Multiplicative seasonal effects below this would flip the sign of
/// the deseasonalized target
const SEASONAL_EFFECT_FLOOR: f64 = -0.95;

/// Regression engine fitting saturating trends with Fourier seasonality
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalCurve {
    simulation_paths: usize,
    seed: u64,
}

impl Default for SeasonalCurve {
    fn default() -> Self {
        Self::new()
    }
}

impl SeasonalCurve {
    pub fn new() -> Self {
        Self {
            simulation_paths: DEFAULT_SIMULATION_PATHS,
            seed: DEFAULT_SIMULATION_SEED,
        }
    }

    /// Override the interval machinery. With `paths == 0` the intervals
    /// come from the Gaussian residual quantile instead of simulation.
    pub fn with_simulation(paths: usize, seed: u64) -> Self {
        Self {
            simulation_paths: paths,
            seed,
        }
    }
}

/// A [`SeasonalCurve`] fitted to one monthly series
#[derive(Debug, Clone)]
pub struct FittedSeasonalCurve {
    scale: TimeScale,
    /// Observed training months, in ascending order; the projection
    /// replays them as the backfill
    training_months: Vec<NaiveDate>,
    last_month: NaiveDate,
    growth: GrowthMode,
    mode: SeasonalityMode,
    interval_width: f64,
    basis: SeasonalBasis,
    seasonal_coef: Vec<f64>,
    /// Intercept, slope, then one delta per changepoint
    trend_coef: Vec<f64>,
    changepoints: Vec<f64>,
    sigma_resid: f64,
    /// Magnitude of future trend shifts, from the fitted deltas
    delta_scale: f64,
    simulation_paths: usize,
    seed: u64,
}

impl RegressionEngine for SeasonalCurve {
    type Fitted = FittedSeasonalCurve;
    type Error = GrowthModelError;

    fn fit(
        &self,
        training: &[MonthlyPoint],
        config: &RegressionConfig,
    ) -> Result<FittedSeasonalCurve> {
        let last = training.last().ok_or_else(|| {
            GrowthModelError::DegenerateSeries("empty training series".to_string())
        })?;
        if training.len() < 2 {
            return Err(GrowthModelError::DegenerateSeries(format!(
                "need at least 2 monthly totals, got {}",
                training.len()
            )));
        }
        if training.iter().any(|p| !p.total.is_finite()) {
            return Err(GrowthModelError::DegenerateSeries(
                "non-finite monthly total".to_string(),
            ));
        }

        let floor = last.floor;
        let cap = last.cap;
        if !floor.is_finite() || !cap.is_finite() {
            return Err(GrowthModelError::Geometry(
                "saturation bounds must be finite".to_string(),
            ));
        }
        if config.growth == GrowthMode::Logistic && cap <= floor {
            return Err(GrowthModelError::Geometry(format!(
                "cap {cap} must exceed floor {floor} for bounded growth"
            )));
        }

        let first_month = training[0].period_start;
        let scale = TimeScale::from_months(first_month, last.period_start);
        let xs: Vec<f64> = training.iter().map(|p| scale.scale(p.period_start)).collect();
        let days: Vec<f64> = training.iter().map(|p| scale.days(p.period_start)).collect();
        let y: Vec<f64> = training.iter().map(|p| p.total).collect();
        let n = y.len();

        let changepoints = changepoint_grid(n);
        let trend_rows: Vec<Vec<f64>> = xs.iter().map(|&x| trend_row(x, &changepoints)).collect();
        let mut trend_penalties = vec![0.0, 0.0];
        trend_penalties.extend(
            std::iter::repeat(1.0 / config.changepoint_prior_scale.powi(2))
                .take(changepoints.len()),
        );

        let basis = SeasonalBasis::from_terms(&config.seasonal_terms);
        let seasonal_rows: Vec<Vec<f64>> = days.iter().map(|&d| basis.row(d)).collect();
        let seasonal_penalties =
            vec![1.0 / config.seasonality_prior_scale.powi(2); basis.width()];

        let mut trend_coef = vec![0.0; 2 + changepoints.len()];
        let mut seasonal_coef = vec![0.0; basis.width()];
        let mut s_hat = vec![0.0; n];

        for _ in 0..BACKFIT_ROUNDS {
            // Trend pass on the deseasonalized series, in link space
            let targets: Vec<f64> = y
                .iter()
                .zip(&s_hat)
                .map(|(&yi, &si)| {
                    let w = deseasonalize(yi, si, config.seasonality_mode);
                    match config.growth {
                        GrowthMode::Logistic => {
                            let u = ((w - floor) / (cap - floor))
                                .clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
                            logit(u)
                        }
                        GrowthMode::Linear => w,
                    }
                })
                .collect();
            trend_coef = ridge_solve(&trend_rows, &targets, &trend_penalties)?;

            if basis.width() == 0 {
                continue;
            }

            // Seasonal pass on the detrended series
            let residuals: Vec<f64> = trend_rows
                .iter()
                .zip(&y)
                .map(|(row, &yi)| {
                    let g = link_value(dot(row, &trend_coef), floor, cap, config.growth);
                    match config.seasonality_mode {
                        SeasonalityMode::Multiplicative => yi / away_from_zero(g) - 1.0,
                        SeasonalityMode::Additive => yi - g,
                    }
                })
                .collect();
            seasonal_coef = ridge_solve(&seasonal_rows, &residuals, &seasonal_penalties)?;
            s_hat = seasonal_rows
                .iter()
                .map(|row| clamp_effect(dot(row, &seasonal_coef), config.seasonality_mode))
                .collect();
        }

        // Residual scale and the magnitude for future trend shifts
        let fitted: Vec<f64> = trend_rows
            .iter()
            .zip(&s_hat)
            .map(|(row, &s)| {
                let g = link_value(dot(row, &trend_coef), floor, cap, config.growth);
                compose(g, s, config.seasonality_mode)
            })
            .collect();
        let sse: f64 = y.iter().zip(&fitted).map(|(a, f)| (a - f).powi(2)).sum();
        let sigma_resid = (sse / (n - 1).max(1) as f64).sqrt();
        if !sigma_resid.is_finite() {
            return Err(GrowthModelError::Numerical(
                "non-finite residual scale".to_string(),
            ));
        }

        let deltas = &trend_coef[2..];
        let delta_scale = if deltas.is_empty() {
            config.changepoint_prior_scale
        } else {
            deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64 + f64::EPSILON
        };

        Ok(FittedSeasonalCurve {
            scale,
            training_months: training.iter().map(|p| p.period_start).collect(),
            last_month: last.period_start,
            growth: config.growth,
            mode: config.seasonality_mode,
            interval_width: config.interval_width,
            basis,
            seasonal_coef,
            trend_coef,
            changepoints,
            sigma_resid,
            delta_scale,
            simulation_paths: self.simulation_paths,
            seed: self.seed,
        })
    }

    fn name(&self) -> &str {
        "seasonal-growth-curve"
    }
}

impl FittedSeasonalCurve {
    /// Residual standard deviation of the fit
    pub fn residual_scale(&self) -> f64 {
        self.sigma_resid
    }

    /// Fitted changepoint deltas
    pub fn changepoint_deltas(&self) -> &[f64] {
        &self.trend_coef[2..]
    }

    fn trend_link(&self, x: f64) -> f64 {
        dot(&trend_row(x, &self.changepoints), &self.trend_coef)
    }

    fn seasonal_effect(&self, days: f64) -> f64 {
        if self.basis.width() == 0 {
            return 0.0;
        }
        clamp_effect(dot(&self.basis.row(days), &self.seasonal_coef), self.mode)
    }

    fn estimate(&self, x: f64, days: f64, floor: f64, cap: f64) -> f64 {
        let g = link_value(self.trend_link(x), floor, cap, self.growth);
        compose(g, self.seasonal_effect(days), self.mode)
    }

    /// Interval edges from simulated trajectories: future changepoints
    /// arrive at the historical rate with Laplace-distributed shifts,
    /// and observation noise matches the residual scale.
    fn simulated_bounds(
        &self,
        axis: &[(f64, f64)],
        floor: f64,
        cap: f64,
    ) -> Result<Vec<(f64, f64)>> {
        let horizon = axis.len();
        let x_end = axis.last().map(|&(x, _)| x).unwrap_or(1.0);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let noise = if self.sigma_resid > 0.0 {
            Some(
                Normal::new(0.0, self.sigma_resid)
                    .map_err(|e| GrowthModelError::Numerical(e.to_string()))?,
            )
        } else {
            None
        };
        let expected_shifts = if self.changepoints.is_empty() || x_end <= 1.0 {
            0.0
        } else {
            self.changepoints.len() as f64 * (x_end - 1.0) / CHANGEPOINT_RANGE
        };
        let arrivals = if expected_shifts > 0.0 {
            Some(
                Poisson::new(expected_shifts)
                    .map_err(|e| GrowthModelError::Numerical(e.to_string()))?,
            )
        } else {
            None
        };

        let mut samples: Vec<Vec<f64>> = (0..horizon)
            .map(|_| Vec::with_capacity(self.simulation_paths))
            .collect();
        for _ in 0..self.simulation_paths {
            let shift_count = arrivals
                .as_ref()
                .map(|p| p.sample(&mut rng) as usize)
                .unwrap_or(0);
            let shifts: Vec<(f64, f64)> = (0..shift_count)
                .map(|_| {
                    (
                        rng.gen_range(1.0..x_end),
                        sample_laplace(&mut rng, self.delta_scale),
                    )
                })
                .collect();

            for (slot, &(x, d)) in samples.iter_mut().zip(axis.iter()) {
                let mut link = self.trend_link(x);
                for &(cx, delta) in &shifts {
                    if x > cx {
                        link += delta * (x - cx);
                    }
                }
                let g = link_value(link, floor, cap, self.growth);
                let mut value = compose(g, self.seasonal_effect(d), self.mode);
                if let Some(noise) = &noise {
                    value += noise.sample(&mut rng);
                }
                slot.push(value);
            }
        }

        let lower_q = (1.0 - self.interval_width) / 2.0;
        let upper_q = (1.0 + self.interval_width) / 2.0;
        Ok(samples
            .into_iter()
            .map(|mut column| {
                column.sort_by(|a, b| a.total_cmp(b));
                (percentile(&column, lower_q), percentile(&column, upper_q))
            })
            .collect())
    }

    /// Interval edges from the Gaussian residual quantile, used for
    /// in-sample rows and whenever simulation is disabled
    fn parametric_bounds(&self, estimates: &[f64]) -> Result<Vec<(f64, f64)>> {
        // An exact fit has no residual spread; width 1.0 would otherwise
        // multiply an infinite quantile by zero
        let margin = if self.sigma_resid > 0.0 {
            let standard = Gaussian::new(0.0, 1.0)
                .map_err(|e| GrowthModelError::Numerical(e.to_string()))?;
            standard.inverse_cdf((1.0 + self.interval_width) / 2.0) * self.sigma_resid
        } else {
            0.0
        };
        Ok(estimates.iter().map(|&e| (e - margin, e + margin)).collect())
    }

    fn rows_for<F>(
        &self,
        months: &[NaiveDate],
        floor: f64,
        cap: f64,
        bounds_for: F,
    ) -> Result<Vec<ProjectedPoint>>
    where
        F: FnOnce(&[f64]) -> Result<Vec<(f64, f64)>>,
    {
        let estimates: Vec<f64> = months
            .iter()
            .map(|&m| self.estimate(self.scale.scale(m), self.scale.days(m), floor, cap))
            .collect();
        let bounds = bounds_for(&estimates)?;
        Ok(months
            .iter()
            .zip(estimates)
            .zip(bounds)
            .map(|((&period_start, point_estimate), (lower, upper))| ProjectedPoint {
                period_start,
                point_estimate,
                lower_bound: lower.min(upper),
                upper_bound: lower.max(upper),
            })
            .collect())
    }
}

impl FittedRegression for FittedSeasonalCurve {
    type Error = GrowthModelError;

    fn project(&self, horizon: usize, floor: f64, cap: f64) -> Result<Vec<ProjectedPoint>> {
        if self.growth == GrowthMode::Logistic && cap <= floor {
            return Err(GrowthModelError::Geometry(format!(
                "cap {cap} must exceed floor {floor} for bounded growth"
            )));
        }

        // In-sample rows replay the observed months; their intervals
        // come from the residual quantile since the fitted trajectory
        // is already conditioned on those observations
        let backfill = self.rows_for(&self.training_months, floor, cap, |estimates| {
            self.parametric_bounds(estimates)
        })?;

        let future_months: Vec<NaiveDate> = (1..=horizon)
            .map(|offset| add_months(self.last_month, offset as u32))
            .collect();
        let future = self.rows_for(&future_months, floor, cap, |estimates| {
            if self.simulation_paths == 0 {
                self.parametric_bounds(estimates)
            } else {
                let axis: Vec<(f64, f64)> = future_months
                    .iter()
                    .map(|&m| (self.scale.scale(m), self.scale.days(m)))
                    .collect();
                self.simulated_bounds(&axis, floor, cap)
            }
        })?;

        Ok(backfill.into_iter().chain(future).collect())
    }
}

fn deseasonalize(y: f64, effect: f64, mode: SeasonalityMode) -> f64 {
    match mode {
        SeasonalityMode::Multiplicative => y / (1.0 + effect),
        SeasonalityMode::Additive => y - effect,
    }
}

fn compose(growth: f64, effect: f64, mode: SeasonalityMode) -> f64 {
    match mode {
        SeasonalityMode::Multiplicative => growth * (1.0 + effect),
        SeasonalityMode::Additive => growth + effect,
    }
}

fn clamp_effect(effect: f64, mode: SeasonalityMode) -> f64 {
    match mode {
        SeasonalityMode::Multiplicative => effect.max(SEASONAL_EFFECT_FLOOR),
        SeasonalityMode::Additive => effect,
    }
}

fn link_value(link: f64, floor: f64, cap: f64, growth: GrowthMode) -> f64 {
    match growth {
        GrowthMode::Logistic => floor + (cap - floor) * sigmoid(link),
        GrowthMode::Linear => link,
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn logit(u: f64) -> f64 {
    (u / (1.0 - u)).ln()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn away_from_zero(g: f64) -> f64 {
    if g.abs() < 1e-9 {
        1e-9_f64.copysign(g)
    } else {
        g
    }
}

/// Laplace(0, scale) via inverse-transform sampling; rand_distr carries
/// no Laplace distribution
fn sample_laplace<R: Rng>(rng: &mut R, scale: f64) -> f64 {
    let u: f64 = rng.gen_range(-0.5..0.5);
    let tail = (1.0 - 2.0 * u.abs()).max(f64::MIN_POSITIVE);
    -scale * u.signum() * tail.ln()
}

/// Nearest-rank percentile over a sorted sample
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
