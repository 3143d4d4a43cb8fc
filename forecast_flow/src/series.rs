//! Monthly aggregation of transactions into a bounded series

use crate::error::{ForecastError, Result};
use crate::record::TransactionRecord;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Minimum number of distinct months required to fit a model
pub const MIN_MONTHLY_POINTS: usize = 6;

/// Headroom applied to the observed monthly peak to form the cap
pub const CAP_HEADROOM: f64 = 1.2;

/// One calendar month of aggregated cash flow.
///
/// The saturation bounds are uniform across a series but ride on every
/// point, since regression engines consume the bounds row-wise during
/// fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyPoint {
    /// First day of the month
    pub period_start: NaiveDate,
    /// Net total of all transactions dated inside the month
    pub total: f64,
    /// Lower saturation bound for the series
    pub floor: f64,
    /// Upper saturation bound for the series
    pub cap: f64,
}

/// A contiguous-by-observation monthly series with its saturation bounds.
///
/// Points are held in ascending `period_start` order with one entry per
/// observed month. Months with no transactions are absent rather than
/// zero-filled.
#[derive(Debug, Clone)]
pub struct MonthlySeries {
    points: Vec<MonthlyPoint>,
    floor: f64,
    cap: f64,
}

impl MonthlySeries {
    /// All observed months in ascending order
    pub fn points(&self) -> &[MonthlyPoint] {
        &self.points
    }

    /// Lower saturation bound applied uniformly to the series
    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Upper saturation bound: observed peak times [`CAP_HEADROOM`]
    pub fn cap(&self) -> f64 {
        self.cap
    }

    /// Number of observed months
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Start of the most recent observed month
    pub fn last_period(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.period_start)
    }

    /// Net total for a given month, if observed
    pub fn total_for(&self, period_start: NaiveDate) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.period_start == period_start)
            .map(|p| p.total)
    }

    /// Training view with the trailing `holdout` months withheld.
    ///
    /// Fails when fewer than [`MIN_MONTHLY_POINTS`] months would remain
    /// for fitting.
    pub fn training_slice(&self, holdout: usize) -> Result<&[MonthlyPoint]> {
        let available = self.points.len().saturating_sub(holdout);
        if available < MIN_MONTHLY_POINTS {
            return Err(ForecastError::InsufficientHistory {
                required: MIN_MONTHLY_POINTS + holdout,
                actual: self.points.len(),
            });
        }
        Ok(&self.points[..available])
    }
}

/// Truncate a date to the first day of its month
pub fn month_start(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month
    date.with_day(1).unwrap()
}

/// First day of the month `count` months after `month`
pub fn add_months(month: NaiveDate, count: u32) -> NaiveDate {
    let total = month.year() * 12 + month.month0() as i32 + count as i32;
    let year = total.div_euclid(12);
    let month0 = total.rem_euclid(12) as u32;
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap()
}

/// Group transactions by calendar month and derive the saturation bounds.
///
/// The cap is the largest observed monthly total scaled by
/// [`CAP_HEADROOM`]. The configured floor applies uniformly, except when
/// it would meet or exceed the cap; such a floor cannot bound this
/// series and collapses to zero (or to the cap itself when even zero
/// sits above it) so the invariant `floor <= cap` always holds.
pub fn aggregate_monthly(
    records: &[TransactionRecord],
    configured_floor: f64,
) -> Result<MonthlySeries> {
    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        *buckets.entry(month_start(record.date)).or_insert(0.0) += record.amount;
    }

    if buckets.len() < MIN_MONTHLY_POINTS {
        return Err(ForecastError::InsufficientHistory {
            required: MIN_MONTHLY_POINTS,
            actual: buckets.len(),
        });
    }

    let peak = buckets.values().fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let cap = peak * CAP_HEADROOM;
    let floor = if configured_floor >= cap {
        cap.min(0.0)
    } else {
        configured_floor
    };

    let points = buckets
        .into_iter()
        .map(|(period_start, total)| MonthlyPoint {
            period_start,
            total,
            floor,
            cap,
        })
        .collect();

    Ok(MonthlySeries { points, floor, cap })
}
