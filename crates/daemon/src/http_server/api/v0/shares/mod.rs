use axum::routing::{delete, get};
use axum::Router;

pub mod create;
pub mod get;
pub mod list;
pub mod purge;
pub mod received;
pub mod revoke;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", get(list::handler).post(create::handler))
        .route("/received", get(received::handler))
        .route("/:key", get(get::handler).delete(purge::handler))
        .route("/:key/:target", delete(revoke::handler))
        .with_state(state)
}
