use axum::routing::get;
use axum::Router;

pub mod delete;
pub mod get;
pub mod list;
pub mod put;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", get(list::handler))
        .route(
            "/:key",
            get(get::handler).put(put::handler).delete(delete::handler),
        )
        .with_state(state)
}
