use axum::extract::{Json, State};
use axum::response::IntoResponse;

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let shares = state.vault().list_shares(&ctx, &caller).await?;
    Ok(Json(shares))
}
