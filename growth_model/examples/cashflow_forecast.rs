use chrono::{Datelike, NaiveDate};
use forecast_flow::series::add_months;
use forecast_flow::{ForecastPipeline, PipelineSettings, TransactionRecord};
use growth_model::SeasonalCurve;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Growth Model: Cash-Flow Forecasting Example");
    println!("===========================================\n");

    // Two years of synthetic monthly business: seasonal revenue with a
    // slow upward drift, plus recurring rent
    println!("Building sample transactions...");
    let transactions = sample_transactions();
    println!("{} transactions created\n", transactions.len());

    // Forecast six months past the end of history, scoring the last
    // three observed months out-of-sample
    let settings = PipelineSettings {
        lookahead_periods: 6,
        holdout_periods: 3,
        ..PipelineSettings::default()
    };
    let pipeline = ForecastPipeline::new(SeasonalCurve::new(), settings)?;

    println!("Running the forecast pipeline...");
    let outcome = pipeline.run(&transactions, Some(0.8))?;

    println!("\n{:<12} {:>10} {:>10} {:>10} {:>10}", "month", "yhat", "lower", "upper", "actual");
    for row in &outcome.rows {
        let actual = row
            .actual
            .map(|a| format!("{a:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            row.ds, row.yhat, row.yhat_lower, row.yhat_upper, actual
        );
    }

    println!("\nDiagnostics: {}", outcome.accuracy);
    if let Some(trend) = outcome.summary.trend_pct {
        println!("Trend vs. last observed month: {trend:+.1}%");
    }

    Ok(())
}

fn sample_transactions() -> Vec<TransactionRecord> {
    let origin = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut records = Vec::new();
    for m in 0..24u32 {
        let month = add_months(origin, m);
        let season = (std::f64::consts::TAU * m as f64 / 12.0).sin();
        let revenue = 12_000.0 + 120.0 * m as f64 + 2_500.0 * season;

        records.push(TransactionRecord {
            date: month.with_day(15).unwrap(),
            amount: revenue,
            description: Some("monthly sales".to_string()),
            category: Some("sales".to_string()),
        });
        records.push(TransactionRecord {
            date: month.with_day(1).unwrap(),
            amount: -3_000.0,
            description: Some("office rent".to_string()),
            category: Some("rent".to_string()),
        });
    }
    records
}
