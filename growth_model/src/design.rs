//! Design-matrix building blocks: time scaling, changepoints, Fourier
//! seasonality

use chrono::NaiveDate;
use forecast_flow::config::SeasonalTerm;
use std::f64::consts::TAU;

/// Most changepoints ever placed on a series
pub const MAX_CHANGEPOINTS: usize = 25;

/// Fraction of history that may contain changepoints
pub const CHANGEPOINT_RANGE: f64 = 0.8;

/// Fourier order used when a term leaves the choice to the engine
pub const DEFAULT_FOURIER_ORDER: usize = 10;

/// Maps calendar dates onto the scaled time axis used by the trend.
///
/// Scaled time runs from 0 at the first training month to 1 at the
/// last; future months extend past 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    origin: NaiveDate,
    span_days: f64,
}

impl TimeScale {
    /// Build a scale over ascending month starts
    pub fn from_months(first: NaiveDate, last: NaiveDate) -> Self {
        let span = (last - first).num_days() as f64;
        Self {
            origin: first,
            // Degenerate single-month spans still need a usable axis
            span_days: span.max(1.0),
        }
    }

    /// Days elapsed since the origin; drives the Fourier terms
    pub fn days(&self, date: NaiveDate) -> f64 {
        (date - self.origin).num_days() as f64
    }

    /// Scaled position of a date; drives the trend
    pub fn scale(&self, date: NaiveDate) -> f64 {
        self.days(date) / self.span_days
    }
}

/// Candidate changepoint positions on the scaled axis.
///
/// Changepoints spread uniformly over the first [`CHANGEPOINT_RANGE`]
/// of history, capped at [`MAX_CHANGEPOINTS`] and thinned for short
/// series so the trend keeps fewer hinge columns than observations.
pub fn changepoint_grid(n_obs: usize) -> Vec<f64> {
    if n_obs < 3 {
        return Vec::new();
    }
    let budget = (CHANGEPOINT_RANGE * n_obs as f64).floor() as usize;
    let count = MAX_CHANGEPOINTS.min(budget.saturating_sub(1));
    (1..=count)
        .map(|j| CHANGEPOINT_RANGE * j as f64 / (count + 1) as f64)
        .collect()
}

/// One trend design row: intercept, slope, then one hinge per changepoint
pub fn trend_row(x: f64, changepoints: &[f64]) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + changepoints.len());
    row.push(1.0);
    row.push(x);
    for &cp in changepoints {
        row.push((x - cp).max(0.0));
    }
    row
}

/// Fourier expansion over the configured seasonal terms
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalBasis {
    terms: Vec<(f64, usize)>,
    width: usize,
}

impl SeasonalBasis {
    pub fn from_terms(terms: &[SeasonalTerm]) -> Self {
        let terms: Vec<(f64, usize)> = terms
            .iter()
            .map(|t| (t.period_days, t.fourier_order.unwrap_or(DEFAULT_FOURIER_ORDER)))
            .collect();
        let width = terms.iter().map(|(_, order)| 2 * order).sum();
        Self { terms, width }
    }

    /// Number of columns the expansion produces
    pub fn width(&self) -> usize {
        self.width
    }

    /// One design row for a date `days` after the series origin
    pub fn row(&self, days: f64) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width);
        for &(period, order) in &self.terms {
            for k in 1..=order {
                let angle = TAU * k as f64 * days / period;
                row.push(angle.cos());
                row.push(angle.sin());
            }
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use forecast_flow::config::{MONTHLY_PERIOD_DAYS, YEARLY_PERIOD_DAYS};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn scaled_time_runs_zero_to_one_over_training() {
        let scale = TimeScale::from_months(date(2024, 1), date(2024, 12));
        assert_relative_eq!(scale.scale(date(2024, 1)), 0.0);
        assert_relative_eq!(scale.scale(date(2024, 12)), 1.0);
        assert!(scale.scale(date(2025, 3)) > 1.0);
    }

    #[rstest]
    #[case(6, 3)]
    #[case(12, 8)]
    #[case(36, 25)]
    #[case(240, 25)]
    fn changepoint_count_tracks_history_length(#[case] n: usize, #[case] expected: usize) {
        assert_eq!(changepoint_grid(n).len(), expected);
    }

    #[test]
    fn changepoints_stay_in_the_first_eighty_percent() {
        let grid = changepoint_grid(36);
        assert!(grid.iter().all(|&cp| cp > 0.0 && cp < CHANGEPOINT_RANGE));
        // Uniform spacing
        assert_relative_eq!(grid[1] - grid[0], grid[2] - grid[1], max_relative = 1e-12);
    }

    #[test]
    fn tiny_series_get_no_changepoints() {
        assert!(changepoint_grid(2).is_empty());
        assert!(changepoint_grid(0).is_empty());
    }

    #[test]
    fn trend_row_hinges_activate_past_their_changepoint() {
        let row = trend_row(0.5, &[0.2, 0.4, 0.6]);
        assert_eq!(row.len(), 5);
        assert_relative_eq!(row[0], 1.0);
        assert_relative_eq!(row[1], 0.5);
        assert_relative_eq!(row[2], 0.3, max_relative = 1e-12);
        assert_relative_eq!(row[3], 0.1, max_relative = 1e-12);
        assert_relative_eq!(row[4], 0.0);
    }

    #[test]
    fn seasonal_basis_width_counts_harmonic_pairs() {
        let basis = SeasonalBasis::from_terms(&[
            SeasonalTerm::new("yearly", YEARLY_PERIOD_DAYS, None),
            SeasonalTerm::new("monthly", MONTHLY_PERIOD_DAYS, Some(5)),
        ]);
        // 2 * (10 + 5)
        assert_eq!(basis.width(), 30);
        assert_eq!(basis.row(100.0).len(), 30);
    }

    #[test]
    fn seasonal_row_repeats_after_one_period() {
        let basis = SeasonalBasis::from_terms(&[SeasonalTerm::new("yearly", 365.25, Some(4))]);
        let a = basis.row(10.0);
        let b = basis.row(10.0 + 365.25);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn seasonal_row_at_origin_is_pure_cosine() {
        let basis = SeasonalBasis::from_terms(&[SeasonalTerm::new("yearly", 365.25, Some(2))]);
        let row = basis.row(0.0);
        assert_relative_eq!(row[0], 1.0);
        assert_relative_eq!(row[1], 0.0);
        assert_relative_eq!(row[2], 1.0);
        assert_relative_eq!(row[3], 0.0);
    }
}
