use axum::Router;

pub mod auth;
pub mod secrets;
pub mod shares;
pub mod users;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/auth", auth::router(state.clone()))
        .nest("/users", users::router(state.clone()))
        .nest("/secrets", secrets::router(state.clone()))
        .nest("/shares", shares::router(state.clone()))
        .with_state(state)
}
