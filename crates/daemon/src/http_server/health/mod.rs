use axum::routing::get;
use axum::Router;

use crate::ServiceState;

mod liveness;
mod readiness;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/livez", get(liveness::handler))
        .route("/readyz", get(readiness::handler))
        .with_state(state)
}
