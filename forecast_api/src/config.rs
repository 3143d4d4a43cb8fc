//! Service configuration from the environment

use axum::http::HeaderValue;
use forecast_flow::PipelineSettings;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// A malformed environment variable
#[derive(Debug, Error)]
#[error("invalid {name}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub reason: String,
}

/// Everything the service reads from its environment
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Pipeline behavior handed to `ForecastPipeline::new`
    pub pipeline: PipelineSettings,
    /// Model fits allowed to run at once; defaults to available cores
    pub max_concurrent_fits: usize,
    /// Per-request deadline for a fit; `None` disables the deadline
    pub fit_timeout: Option<Duration>,
    /// CORS origin allow-list; `*` anywhere means any origin
    pub allowed_origins: Vec<String>,
}

impl ServiceConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through a lookup function; tests inject maps
    /// here instead of mutating the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var(&lookup, "PORT", 8080u16)?;

        let pipeline = PipelineSettings {
            default_confidence: parse_var(&lookup, "FORECAST_DEFAULT_CONFIDENCE", 0.8f64)?,
            floor: parse_var(&lookup, "FORECAST_FLOOR", 5000.0f64)?,
            lookahead_periods: parse_var(&lookup, "FORECAST_LOOKAHEAD_PERIODS", 3usize)?,
            holdout_periods: parse_var(&lookup, "FORECAST_HOLDOUT_PERIODS", 0usize)?,
            changepoint_prior_scale: parse_var(&lookup, "FORECAST_CHANGEPOINT_PRIOR_SCALE", 0.1f64)?,
            seasonality_prior_scale: parse_var(&lookup, "FORECAST_SEASONALITY_PRIOR_SCALE", 4.0f64)?,
        };

        let default_fits = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        let max_concurrent_fits = parse_var(&lookup, "FORECAST_MAX_CONCURRENT_FITS", default_fits)?;
        if max_concurrent_fits == 0 {
            return Err(ConfigError {
                name: "FORECAST_MAX_CONCURRENT_FITS",
                reason: "must be at least 1".to_string(),
            });
        }

        let timeout_secs = parse_var(&lookup, "FORECAST_FIT_TIMEOUT_SECS", 30u64)?;
        let fit_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            pipeline,
            max_concurrent_fits,
            fit_timeout,
            allowed_origins,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            name,
            reason: format!("{e} (got '{raw}')"),
        }),
        None => Ok(default),
    }
}

/// CORS layer honoring the configured origin allow-list
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }
    let list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(list))
}
