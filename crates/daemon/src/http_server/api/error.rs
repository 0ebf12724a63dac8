//! One mapping from vault errors to HTTP responses.
//!
//! Backend, crypto and compensation failures are logged in full and answered
//! with a generic message; everything else echoes the error text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use common::error::VaultError;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub VaultError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            VaultError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            VaultError::NotFound(_) | VaultError::NotShared(_) => StatusCode::NOT_FOUND,
            VaultError::AlreadyExists(_) => StatusCode::CONFLICT,
            VaultError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            VaultError::Forbidden(_) => StatusCode::FORBIDDEN,
            VaultError::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            VaultError::Store { .. }
            | VaultError::Crypto(_)
            | VaultError::CompensationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self.0 {
            VaultError::CompensationFailed { cause, failures } => {
                tracing::error!(
                    cause = %cause,
                    failures = %failures,
                    "request left the stores inconsistent"
                );
                "internal error".to_string()
            }
            VaultError::Store { .. } | VaultError::Crypto(_) => {
                tracing::error!("request failed: {}", self.0);
                "internal error".to_string()
            }
            other => {
                tracing::debug!("request rejected: {}", other);
                other.to_string()
            }
        };
        let body = serde_json::json!({"kind": self.0.kind(), "msg": msg});
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use common::error::InverseFailures;
    use common::store::StoreError;

    use super::*;

    #[test]
    fn test_status_per_kind() {
        let cases = [
            (VaultError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (VaultError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (VaultError::NotShared("x".into()), StatusCode::NOT_FOUND),
            (VaultError::AlreadyExists("x".into()), StatusCode::CONFLICT),
            (VaultError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (VaultError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (VaultError::Cancelled("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                VaultError::store("x", StoreError::Backend(anyhow::anyhow!("boom"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                VaultError::CompensationFailed {
                    cause: Box::new(VaultError::Cancelled("x".into())),
                    failures: InverseFailures::default(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let kind = err.kind();
            assert_eq!(ApiError(err).into_response().status(), status, "{kind}");
        }
    }
}
