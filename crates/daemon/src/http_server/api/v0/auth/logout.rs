use axum::extract::State;
use axum::http::StatusCode;

use crate::http_server::api::Authenticated;
use crate::ServiceState;

/// Tokens are stateless; the client discards its copy.
pub async fn handler(
    State(state): State<ServiceState>,
    Authenticated(caller): Authenticated,
) -> StatusCode {
    state.vault().logout(&caller);
    StatusCode::NO_CONTENT
}
