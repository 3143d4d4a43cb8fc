//! # forecast_api
//!
//! REST API server for monthly cash-flow forecasting. Transactions are
//! posted as JSON, aggregated into a bounded monthly series, fitted with
//! the seasonal growth model and returned as forecast rows with
//! accuracy diagnostics.

use axum::{
    routing::{get, post},
    Router,
};
use forecast_flow::ForecastPipeline;
use growth_model::SeasonalCurve;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod routes;

use config::ServiceConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ForecastPipeline<SeasonalCurve>>,
    fit_permits: Arc<Semaphore>,
    fit_timeout: Option<Duration>,
}

#[tokio::main]
async fn main() {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forecast_api=info,tower_http=info".into()),
        )
        .init();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration is invalid");
            std::process::exit(1);
        }
    };

    let pipeline = match ForecastPipeline::new(SeasonalCurve::new(), config.pipeline.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(error = %e, "pipeline settings rejected");
            std::process::exit(1);
        }
    };

    let state = AppState {
        pipeline: Arc::new(pipeline),
        fit_permits: Arc::new(Semaphore::new(config.max_concurrent_fits)),
        fit_timeout: config.fit_timeout,
    };

    // Build router with middleware
    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/forecast", post(routes::forecast))
        .layer(TraceLayer::new_for_http())
        .layer(config::cors_layer(&config.allowed_origins))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST:PORT configuration");

    tracing::info!(
        "forecast_api v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
