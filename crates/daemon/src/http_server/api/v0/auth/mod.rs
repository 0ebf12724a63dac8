use axum::routing::{get, post, put};
use axum::Router;

pub mod login;
pub mod logout;
pub mod password;
pub mod refresh;
pub mod register;
pub mod validate;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/register", post(register::handler))
        .route("/login", post(login::handler))
        .route("/logout", post(logout::handler))
        .route("/refresh", post(refresh::handler))
        .route("/validate", get(validate::handler))
        .route("/password", put(password::handler))
        .with_state(state)
}
