use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::logging::logging_middleware;
use crate::middleware::auth::require_auth;
use crate::state::Gate;

/// Routes for the token lifecycle: `POST /login`, `GET|POST /refresh_token`
/// and `POST /logout`.
///
/// They sit outside the authentication layer so that an expired token can
/// still be refreshed inside its refresh window.
pub fn init_token_router() -> Router<Gate> {
    Router::new()
        .route("/login", post(handlers::login))
        .route(
            "/refresh_token",
            get(handlers::refresh).post(handlers::refresh),
        )
        .route("/logout", post(handlers::logout))
}

/// The token routes plus `protected`, which is placed behind [`require_auth`].
///
/// `protected` must declare at least one route.
pub fn init_router(gate: Gate, protected: Router<Gate>) -> Router {
    Router::new()
        .merge(init_token_router())
        .merge(protected.route_layer(middleware::from_fn_with_state(gate.clone(), require_auth)))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(gate)
}
