use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
    Path((key, target)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .vault()
        .delete_share_target(&ctx, &caller, &key, &target)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
