use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

/// `key` is either one of the caller's keys or an `owner:key` reference.
pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let secret = state.vault().read_secret(&ctx, &caller, &key).await?;
    Ok(Json(secret))
}
