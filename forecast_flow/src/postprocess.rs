//! Post-processing of raw model output: clipping, actuals and accuracy

use crate::engine::ProjectedPoint;
use crate::series::MonthlySeries;
use chrono::NaiveDate;
use std::fmt;

/// One forecast month after post-processing
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    /// First day of the month
    pub period_start: NaiveDate,
    /// Central estimate, clipped to `[0, cap]`
    pub point_estimate: f64,
    /// Lower interval edge, clipped and re-ordered below the estimate
    pub lower_bound: f64,
    /// Upper interval edge, clipped and re-ordered above the estimate
    pub upper_bound: f64,
    /// Observed monthly total when the month overlaps history
    pub actual: Option<f64>,
}

/// Forecast accuracy over months where an observed total exists.
///
/// Both fields stay `None` when no month qualifies for the metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccuracyReport {
    /// Mean absolute percentage error over months with a non-zero actual
    pub mape: Option<f64>,
    /// Share of months whose actual falls inside the forecast interval
    pub ci_coverage: Option<f64>,
}

impl fmt::Display for AccuracyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mape {
            Some(mape) => write!(f, "MAPE: {mape:.2}%")?,
            None => write!(f, "MAPE: n/a")?,
        }
        match self.ci_coverage {
            Some(coverage) => write!(f, ", CI coverage: {:.0}%", coverage * 100.0),
            None => write!(f, ", CI coverage: n/a"),
        }
    }
}

/// Averages over the forecast window, for quick dashboards
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForecastSummary {
    /// Mean of observed totals across overlap months
    pub historical_avg: Option<f64>,
    /// Mean point estimate across future-only months
    pub forecast_avg: Option<f64>,
    /// Change from the last observed total to the last point estimate,
    /// as a percentage of the former
    pub trend_pct: Option<f64>,
}

/// Clip raw projections into `[0, cap]` and restore interval ordering.
///
/// Engines can emit negative lower bounds or upper bounds past the cap;
/// after clipping, bounds are re-ordered so that
/// `0 <= lower <= point <= upper <= cap` always holds.
pub fn clip_to_bounds(projected: Vec<ProjectedPoint>, cap: f64) -> Vec<ForecastPoint> {
    projected
        .into_iter()
        .map(|p| {
            let point_estimate = p.point_estimate.clamp(0.0, cap);
            let lower_bound = p.lower_bound.clamp(0.0, cap).min(point_estimate);
            let upper_bound = p.upper_bound.clamp(0.0, cap).max(point_estimate);
            ForecastPoint {
                period_start: p.period_start,
                point_estimate,
                lower_bound,
                upper_bound,
                actual: None,
            }
        })
        .collect()
}

/// Attach observed monthly totals to forecast months that overlap history
pub fn merge_actuals(points: &mut [ForecastPoint], series: &MonthlySeries) {
    for point in points.iter_mut() {
        point.actual = series.total_for(point.period_start);
    }
}

/// Score the forecast against observed months.
///
/// MAPE averages `|actual - point| / |actual|` over months with a
/// non-zero actual, expressed as a percentage. Interval coverage counts
/// months whose actual lies inside `[lower, upper]`. Months without an
/// actual contribute to neither metric.
pub fn score_accuracy(points: &[ForecastPoint]) -> AccuracyReport {
    let mut mape_sum = 0.0;
    let mut mape_count = 0usize;
    let mut covered = 0usize;
    let mut observed = 0usize;

    for point in points {
        let Some(actual) = point.actual else { continue };
        observed += 1;
        if actual >= point.lower_bound && actual <= point.upper_bound {
            covered += 1;
        }
        if actual != 0.0 {
            mape_sum += ((actual - point.point_estimate) / actual).abs();
            mape_count += 1;
        }
    }

    AccuracyReport {
        mape: (mape_count > 0).then(|| mape_sum / mape_count as f64 * 100.0),
        ci_coverage: (observed > 0).then(|| covered as f64 / observed as f64),
    }
}

/// Reduce the forecast window to headline averages
pub fn summarize(points: &[ForecastPoint]) -> ForecastSummary {
    let actuals: Vec<f64> = points.iter().filter_map(|p| p.actual).collect();
    let future: Vec<f64> = points
        .iter()
        .filter(|p| p.actual.is_none())
        .map(|p| p.point_estimate)
        .collect();

    let historical_avg = mean(&actuals);
    let forecast_avg = mean(&future);

    let last_actual = points.iter().rev().find_map(|p| p.actual);
    let last_estimate = points.last().map(|p| p.point_estimate);
    let trend_pct = match (last_actual, last_estimate) {
        (Some(actual), Some(estimate)) if actual != 0.0 => {
            Some((estimate - actual) / actual * 100.0)
        }
        _ => None,
    };

    ForecastSummary {
        historical_avg,
        forecast_avg,
        trend_pct,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    fn projected(m: u32, lower: f64, point: f64, upper: f64) -> ProjectedPoint {
        ProjectedPoint {
            period_start: month(m),
            point_estimate: point,
            lower_bound: lower,
            upper_bound: upper,
        }
    }

    fn observed(m: u32, lower: f64, point: f64, upper: f64, actual: f64) -> ForecastPoint {
        ForecastPoint {
            period_start: month(m),
            point_estimate: point,
            lower_bound: lower,
            upper_bound: upper,
            actual: Some(actual),
        }
    }

    #[test]
    fn clipping_bounds_negative_and_overflowing_values() {
        let raw = vec![
            projected(1, -500.0, 100.0, 900.0),
            projected(2, 700.0, 1900.0, 2500.0),
        ];
        let clipped = clip_to_bounds(raw, 1800.0);

        assert_eq!(clipped[0].lower_bound, 0.0);
        assert_eq!(clipped[0].point_estimate, 100.0);
        assert_eq!(clipped[0].upper_bound, 900.0);

        assert_eq!(clipped[1].point_estimate, 1800.0);
        assert_eq!(clipped[1].upper_bound, 1800.0);
    }

    #[test]
    fn clipping_restores_interval_ordering() {
        // Inverted bounds from a misbehaving engine
        let raw = vec![projected(1, 400.0, 300.0, 200.0)];
        let clipped = clip_to_bounds(raw, 1000.0);
        let p = &clipped[0];
        assert!(p.lower_bound <= p.point_estimate);
        assert!(p.point_estimate <= p.upper_bound);
    }

    #[test]
    fn mape_skips_zero_actuals() {
        let points = vec![
            observed(1, 50.0, 110.0, 200.0, 100.0), // 10% error
            observed(2, 0.0, 50.0, 100.0, 0.0),     // excluded from MAPE
            observed(3, 50.0, 90.0, 200.0, 100.0),  // 10% error
        ];
        let report = score_accuracy(&points);
        assert_relative_eq!(report.mape.unwrap(), 10.0, max_relative = 1e-12);
        // Zero actual still counts toward coverage
        assert_relative_eq!(report.ci_coverage.unwrap(), 1.0);
    }

    #[test]
    fn mape_handles_negative_actuals() {
        let points = vec![observed(1, -300.0, -90.0, 0.0, -100.0)];
        let report = score_accuracy(&points);
        assert_relative_eq!(report.mape.unwrap(), 10.0, max_relative = 1e-12);
    }

    #[test]
    fn coverage_counts_only_months_inside_interval() {
        let points = vec![
            observed(1, 50.0, 100.0, 150.0, 120.0),  // inside
            observed(2, 50.0, 100.0, 150.0, 200.0),  // outside
            observed(3, 50.0, 100.0, 150.0, 50.0),   // boundary counts
            ForecastPoint {
                period_start: month(4),
                point_estimate: 100.0,
                lower_bound: 50.0,
                upper_bound: 150.0,
                actual: None,
            },
        ];
        let report = score_accuracy(&points);
        assert_relative_eq!(report.ci_coverage.unwrap(), 2.0 / 3.0, max_relative = 1e-12);
    }

    #[test]
    fn metrics_absent_without_observed_months() {
        let points = clip_to_bounds(vec![projected(1, 10.0, 20.0, 30.0)], 100.0);
        let report = score_accuracy(&points);
        assert_eq!(report.mape, None);
        assert_eq!(report.ci_coverage, None);
        assert_eq!(report.to_string(), "MAPE: n/a, CI coverage: n/a");
    }

    #[test]
    fn mape_absent_when_all_actuals_are_zero() {
        let points = vec![observed(1, 0.0, 10.0, 20.0, 0.0)];
        let report = score_accuracy(&points);
        assert_eq!(report.mape, None);
        assert!(report.ci_coverage.is_some());
    }

    #[test]
    fn summary_splits_overlap_and_future() {
        let mut points = vec![
            observed(1, 0.0, 110.0, 200.0, 100.0),
            observed(2, 0.0, 190.0, 300.0, 200.0),
        ];
        points.extend(clip_to_bounds(
            vec![projected(3, 100.0, 300.0, 500.0), projected(4, 100.0, 500.0, 900.0)],
            1000.0,
        ));

        let summary = summarize(&points);
        assert_relative_eq!(summary.historical_avg.unwrap(), 150.0);
        assert_relative_eq!(summary.forecast_avg.unwrap(), 400.0);
        // (500 - 200) / 200
        assert_relative_eq!(summary.trend_pct.unwrap(), 150.0);
    }
}
