use axum::extract::{Json, State};
use axum::response::IntoResponse;

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

/// The caller's own secrets followed by every secret shared with them.
pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let secrets = state.vault().list_secrets(&ctx, &caller).await?;
    Ok(Json(secrets))
}
