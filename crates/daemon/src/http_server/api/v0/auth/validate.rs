use axum::extract::{Json, State};
use axum::response::IntoResponse;

use crate::http_server::api::{ApiError, BearerToken};
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse, ApiError> {
    let identity = state.vault().validate(&token)?;
    Ok(Json(identity))
}
