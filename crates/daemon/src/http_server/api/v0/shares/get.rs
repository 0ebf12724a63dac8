use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let shares = state.vault().get_share(&ctx, &caller, &key).await?;
    Ok(Json(shares))
}
