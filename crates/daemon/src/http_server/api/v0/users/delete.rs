use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

/// Removes the user with every secret, share and key they own.
pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
    Path(handle): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.vault().delete_user(&ctx, &caller, &handle).await?;
    Ok(StatusCode::NO_CONTENT)
}
