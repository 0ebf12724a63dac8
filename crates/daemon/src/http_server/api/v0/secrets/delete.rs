use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.vault().delete_secret(&ctx, &caller, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}
