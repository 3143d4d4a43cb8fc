//! API route handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use forecast_flow::record::parse_records;
use forecast_flow::{ForecastError, ForecastRow, TransactionDraft};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::AppState;

/// Request body for `POST /forecast`
#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    /// Transactions to aggregate and forecast from
    pub data: Vec<TransactionDraft>,
    /// Interval confidence level in `(0, 1]`; the service default
    /// applies when omitted
    #[serde(default, rename = "confidenceLevel")]
    pub confidence_level: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors a handler can answer with
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Forecast timed out before the model fit completed")]
    Timeout,

    #[error("Service is not accepting forecast requests")]
    Unavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Forecast(ForecastError::Validation(_))
            | ApiError::Forecast(ForecastError::InsufficientHistory { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Forecast(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

/// Liveness check
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": concat!(
            env!("CARGO_PKG_NAME"),
            " ",
            env!("CARGO_PKG_VERSION"),
            " is running"
        )
    }))
}

/// Run transactions through the forecast pipeline.
///
/// Responds with the bare ordered row array; accuracy and summary
/// diagnostics are logged, not returned. The CPU-bound fit runs on the
/// blocking pool behind a semaphore so a burst of requests cannot
/// saturate every worker thread.
pub async fn forecast(
    State(state): State<AppState>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<Vec<ForecastRow>>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ForecastError::Validation(format!("malformed request body: {rejection}"))
    })?;

    if request.data.is_empty() {
        return Err(ForecastError::Validation("data must not be empty".to_string()).into());
    }

    let records = parse_records(&request.data)?;
    let confidence = request.confidence_level;

    let pipeline = Arc::clone(&state.pipeline);
    let outcome = run_bounded(&state.fit_permits, state.fit_timeout, move || {
        pipeline.run(&records, confidence)
    })
    .await??;

    Ok(Json(outcome.rows))
}

/// Run a CPU-bound job on the blocking pool, gated by a permit and an
/// optional deadline.
///
/// The permit rides inside the blocking closure, so a fit abandoned at
/// its deadline keeps its slot occupied until the thread actually
/// finishes.
async fn run_bounded<F, T>(
    permits: &Arc<Semaphore>,
    deadline: Option<Duration>,
    job: F,
) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let permit = permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ApiError::Unavailable)?;

    let handle = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        job()
    });

    let joined = match deadline {
        Some(deadline) => tokio::time::timeout(deadline, handle).await.map_err(|_| {
            tracing::warn!(?deadline, "forecast fit exceeded its deadline");
            ApiError::Timeout
        })?,
        None => handle.await,
    };

    joined.map_err(|e| {
        tracing::error!(error = %e, "forecast task did not complete");
        ApiError::Forecast(ForecastError::ModelFit(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_flow::{ForecastPipeline, PipelineSettings};
    use growth_model::SeasonalCurve;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::time::Instant;

    fn test_state(settings: PipelineSettings) -> AppState {
        AppState {
            pipeline: Arc::new(ForecastPipeline::new(SeasonalCurve::new(), settings).unwrap()),
            fit_permits: Arc::new(Semaphore::new(2)),
            fit_timeout: None,
        }
    }

    fn monthly_drafts(months: u32) -> Vec<TransactionDraft> {
        (0..months)
            .map(|i| TransactionDraft {
                date: format!("2024-{:02}-15", i % 12 + 1),
                amount: 1000.0 + 50.0 * i as f64,
                description: None,
                category: None,
            })
            .collect()
    }

    #[rstest]
    #[case(ApiError::Forecast(ForecastError::Validation("bad".into())), StatusCode::BAD_REQUEST)]
    #[case(
        ApiError::Forecast(ForecastError::InsufficientHistory { required: 6, actual: 2 }),
        StatusCode::BAD_REQUEST
    )]
    #[case(
        ApiError::Forecast(ForecastError::ModelFit("diverged".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    #[case(ApiError::Timeout, StatusCode::GATEWAY_TIMEOUT)]
    #[case(ApiError::Unavailable, StatusCode::SERVICE_UNAVAILABLE)]
    fn errors_map_to_expected_status(#[case] error: ApiError, #[case] expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[test]
    fn request_accepts_camel_case_confidence() {
        let request: ForecastRequest = serde_json::from_value(serde_json::json!({
            "data": [{"date": "2024-01-15", "amount": 100.0}],
            "confidenceLevel": 0.9
        }))
        .unwrap();
        assert_eq!(request.confidence_level, Some(0.9));
        assert_eq!(request.data.len(), 1);
    }

    #[test]
    fn request_confidence_defaults_to_none() {
        let request: ForecastRequest = serde_json::from_value(serde_json::json!({
            "data": [{"date": "2024-01-15", "amount": 100.0}]
        }))
        .unwrap();
        assert_eq!(request.confidence_level, None);
    }

    #[tokio::test]
    async fn health_reports_ok_with_a_message() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert!(body["message"].as_str().unwrap().contains("running"));
    }

    #[tokio::test]
    async fn forecast_serializes_as_a_bare_row_array() {
        let state = test_state(PipelineSettings::default());
        let request = ForecastRequest {
            data: monthly_drafts(8),
            confidence_level: None,
        };

        let Json(rows) = forecast(State(state), Ok(Json(request))).await.unwrap();
        let json = serde_json::to_value(&rows).unwrap();
        // Clients index the response directly, so no wrapping object
        assert!(json.is_array());
        let first = &json[0];
        for key in ["ds", "yhat", "yhat_lower", "yhat_upper", "actual"] {
            assert!(first.get(key).is_some(), "row is missing {key}");
        }
    }

    #[tokio::test]
    async fn forecast_covers_history_and_lookahead() {
        let state = test_state(PipelineSettings::default());
        let request = ForecastRequest {
            data: monthly_drafts(8),
            confidence_level: None,
        };

        let Json(rows) = forecast(State(state), Ok(Json(request))).await.unwrap();
        // 8 observed months plus the default 3-month lookahead
        assert_eq!(rows.len(), 11);
        assert_eq!(rows[0].ds, "2024-01-01");
        assert_eq!(rows[8].ds, "2024-09-01");
        assert!(rows[..8].iter().all(|row| row.actual.is_some()));
        assert!(rows[8..].iter().all(|row| row.actual.is_none()));
    }

    #[tokio::test]
    async fn forecast_replays_holdout_months_with_actuals() {
        let settings = PipelineSettings {
            holdout_periods: 2,
            ..PipelineSettings::default()
        };
        let state = test_state(settings);
        let request = ForecastRequest {
            data: monthly_drafts(10),
            confidence_level: None,
        };

        let Json(rows) = forecast(State(state), Ok(Json(request))).await.unwrap();
        // 8 training months, 2 withheld, 3 ahead
        assert_eq!(rows.len(), 13);
        assert!(rows[9].actual.is_some());
        assert!(rows[10].actual.is_none());
    }

    #[tokio::test]
    async fn forecast_rejects_empty_data() {
        let state = test_state(PipelineSettings::default());
        let request = ForecastRequest {
            data: vec![],
            confidence_level: None,
        };

        let error = forecast(State(state), Ok(Json(request))).await.unwrap_err();
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn forecast_rejects_short_history() {
        let state = test_state(PipelineSettings::default());
        let request = ForecastRequest {
            data: monthly_drafts(4),
            confidence_level: None,
        };

        let error = forecast(State(state), Ok(Json(request))).await.unwrap_err();
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn forecast_rejects_malformed_date() {
        let state = test_state(PipelineSettings::default());
        let mut data = monthly_drafts(8);
        data[3].date = "15/04/2024".to_string();
        let request = ForecastRequest {
            data,
            confidence_level: None,
        };

        let error = forecast(State(state), Ok(Json(request))).await.unwrap_err();
        assert!(matches!(
            error,
            ApiError::Forecast(ForecastError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn forecast_rejects_out_of_range_confidence() {
        let state = test_state(PipelineSettings::default());
        let request = ForecastRequest {
            data: monthly_drafts(8),
            confidence_level: Some(1.5),
        };

        let error = forecast(State(state), Ok(Json(request))).await.unwrap_err();
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn run_bounded_returns_the_job_result() {
        let permits = Arc::new(Semaphore::new(1));
        let result = run_bounded(&permits, Some(Duration::from_secs(5)), || 42).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn run_bounded_times_out_slow_jobs() {
        let permits = Arc::new(Semaphore::new(1));
        let result = run_bounded(&permits, Some(Duration::from_millis(10)), || {
            std::thread::sleep(Duration::from_millis(300));
        })
        .await;
        assert!(matches!(result, Err(ApiError::Timeout)));
    }

    #[tokio::test]
    async fn run_bounded_serializes_jobs_on_one_permit() {
        let permits = Arc::new(Semaphore::new(1));
        let started = Instant::now();

        let first = run_bounded(&permits, None, || {
            std::thread::sleep(Duration::from_millis(30));
        });
        let second = run_bounded(&permits, None, || {
            std::thread::sleep(Duration::from_millis(30));
        });
        let (a, b) = tokio::join!(first, second);

        assert!(a.is_ok() && b.is_ok());
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn run_bounded_reports_closed_queue() {
        let permits = Arc::new(Semaphore::new(1));
        permits.close();
        let result = run_bounded(&permits, None, || 1).await;
        assert!(matches!(result, Err(ApiError::Unavailable)));
    }
}
