use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use crate::ServiceState;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum ReadinessError {
    #[error("one or more dependencies aren't available")]
    DependencyFailure,
    #[error("service is shutting down")]
    ShuttingDown,
}

async fn is_ready(state: &ServiceState) -> Result<(), ReadinessError> {
    if state.is_shutting_down() {
        return Err(ReadinessError::ShuttingDown);
    }
    state.database().ping().await.map_err(|e| {
        tracing::warn!("readiness check failed on the database: {}", e);
        ReadinessError::DependencyFailure
    })
}

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Response {
    match timeout(HEALTH_CHECK_TIMEOUT, is_ready(&state)).await {
        Ok(Ok(())) => {
            let msg = serde_json::json!({"status": "ok"});
            (StatusCode::OK, Json(msg)).into_response()
        }
        Ok(Err(e)) => {
            let msg = serde_json::json!({"status": "failure", "message": e.to_string()});
            (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
        }
        Err(_) => {
            let msg = serde_json::json!({
                "status": "failure",
                "message": "health check timed out"
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
        }
    }
}
