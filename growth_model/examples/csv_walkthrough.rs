use forecast_flow::record::load_csv;
use forecast_flow::{ForecastPipeline, PipelineSettings};
use growth_model::SeasonalCurve;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let csv_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("examples")
        .join("csv")
        .join("transactions.csv");

    println!("Loading transactions from: {}", csv_path.display());
    let import = load_csv(&csv_path)?;
    println!(
        "{} rows accepted, {} rejected",
        import.accepted.len(),
        import.rejected.len()
    );
    for row in &import.rejected {
        println!("  row {} skipped: {}", row.index, row.reasons.join("; "));
    }

    let pipeline = ForecastPipeline::new(SeasonalCurve::new(), PipelineSettings::default())?;
    let outcome = pipeline.run(&import.accepted, None)?;

    println!("\nForecast:");
    for row in &outcome.rows {
        println!(
            "  {}  {:>10.2}  [{:>10.2}, {:>10.2}]",
            row.ds, row.yhat, row.yhat_lower, row.yhat_upper
        );
    }
    println!("\n{}", outcome.accuracy);

    Ok(())
}
