//! Wire-format forecast rows

use crate::postprocess::ForecastPoint;
use serde::Serialize;

/// One forecast month as serialized to clients.
///
/// `actual` is always present in the JSON output, as an explicit null
/// for months without observed history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    /// Month start as `YYYY-MM-DD`
    pub ds: String,
    /// Central estimate, rounded to two decimals
    pub yhat: f64,
    /// Lower interval edge, rounded to two decimals
    pub yhat_lower: f64,
    /// Upper interval edge, rounded to two decimals
    pub yhat_upper: f64,
    /// Observed monthly total, rounded, or null
    pub actual: Option<f64>,
}

/// Round to two decimal places for presentation
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render post-processed points as wire rows in ascending month order
pub fn render_rows(points: &[ForecastPoint]) -> Vec<ForecastRow> {
    let mut ordered: Vec<&ForecastPoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.period_start);
    ordered
        .into_iter()
        .map(|p| ForecastRow {
            ds: p.period_start.format("%Y-%m-%d").to_string(),
            yhat: round2(p.point_estimate),
            yhat_lower: round2(p.lower_bound),
            yhat_upper: round2(p.upper_bound),
            actual: p.actual.map(round2),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn point(month: u32, estimate: f64, actual: Option<f64>) -> ForecastPoint {
        ForecastPoint {
            period_start: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            point_estimate: estimate,
            lower_bound: estimate - 10.0,
            upper_bound: estimate + 10.0,
            actual,
        }
    }

    #[test]
    fn rows_are_rounded_and_dated() {
        let rows = render_rows(&[point(3, 1234.5678, Some(1200.004))]);
        assert_eq!(rows[0].ds, "2024-03-01");
        assert_eq!(rows[0].yhat, 1234.57);
        assert_eq!(rows[0].yhat_lower, 1224.57);
        assert_eq!(rows[0].yhat_upper, 1244.57);
        assert_eq!(rows[0].actual, Some(1200.0));
    }

    #[test]
    fn rows_sorted_by_month() {
        let rows = render_rows(&[point(5, 1.0, None), point(2, 2.0, None), point(9, 3.0, None)]);
        let ds: Vec<&str> = rows.iter().map(|r| r.ds.as_str()).collect();
        assert_eq!(ds, vec!["2024-02-01", "2024-05-01", "2024-09-01"]);
    }

    #[test]
    fn missing_actual_serializes_as_null() {
        let rows = render_rows(&[point(1, 100.0, None)]);
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["actual"], serde_json::Value::Null);
        assert_eq!(json["yhat"], serde_json::json!(100.0));
    }

    #[test]
    fn rounding_keeps_interval_ordering() {
        // Bounds a hair apart must not cross after rounding
        let p = ForecastPoint {
            period_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            point_estimate: 100.004,
            lower_bound: 100.001,
            upper_bound: 100.006,
            actual: None,
        };
        let rows = render_rows(&[p]);
        assert!(rows[0].yhat_lower <= rows[0].yhat);
        assert!(rows[0].yhat <= rows[0].yhat_upper);
    }
}
