use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
    Path(handle): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.vault().get_user(&ctx, &caller, &handle).await?;
    Ok(Json(profile))
}
