use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

#[derive(Clone, Serialize, Deserialize)]
pub struct PutSecretRequest {
    pub value: String,
}

impl std::fmt::Debug for PutSecretRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PutSecretRequest { .. }")
    }
}

/// Create or replace. Replacing drops every share of the old value.
pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
    Path(key): Path<String>,
    Json(req): Json<PutSecretRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let secret = state
        .vault()
        .create_secret(&ctx, &caller, &key, &req.value)
        .await?;
    Ok(Json(secret))
}
