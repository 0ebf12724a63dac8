use axum::extract::{Json, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current: String,
    pub new: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .vault()
        .change_password(&ctx, &caller, &req.current, &req.new)
        .await?;
    Ok(Json(profile))
}
