use axum::Router;

pub mod error;
pub mod extract;
pub mod v0;

pub use error::ApiError;
pub use extract::{Authenticated, BearerToken, RequestContext};

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/v0", v0::router(state.clone()))
        .with_state(state)
}
