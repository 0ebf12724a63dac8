use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::http_server::api::{ApiError, RequestContext};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub handle: String,
    pub name: String,
    pub password: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .vault()
        .register(&ctx, &req.handle, &req.name, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}
