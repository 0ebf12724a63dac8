use axum::extract::{Json, State};
use axum::response::IntoResponse;

use crate::http_server::api::{ApiError, BearerToken, RequestContext};
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.vault().refresh(&ctx, &token).await?;
    Ok(Json(session))
}
