use axum::routing::get;
use axum::Router;

pub mod delete;
pub mod get;
pub mod list;
pub mod update;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", get(list::handler))
        .route(
            "/:handle",
            get(get::handler)
                .patch(update::handler)
                .delete(delete::handler),
        )
        .with_state(state)
}
