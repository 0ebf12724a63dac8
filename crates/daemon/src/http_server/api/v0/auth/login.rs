use axum::extract::{Json, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::http_server::api::{ApiError, RequestContext};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub handle: String,
    pub password: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.vault().login(&ctx, &req.handle, &req.password).await?;
    Ok(Json(session))
}
