use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tokengate_auth::{Authenticated, TokenClaims};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::request::request_view;
use crate::state::Gate;

/// A rejection recorded on the request when aborting is disabled.
#[derive(Debug, Clone)]
pub struct AuthRejection {
    pub status: StatusCode,
    pub message: String,
}

/// Authenticates every request passing through the layer.
///
/// On success the [`Authenticated`] result is stored as a request extension
/// and read back by [`AuthContext`]. On failure the request is answered by
/// the gate's renderer with a `WWW-Authenticate` challenge, unless
/// `disable_abort` is set: then the inner handler still runs with an
/// [`AuthRejection`] extension, and the challenge is added to its response.
///
/// # Usage with axum::middleware::from_fn_with_state
///
/// ```rust,ignore
/// use axum::{Router, middleware, routing::get};
/// use tokengate::middleware::auth::require_auth;
///
/// let protected = Router::new()
///     .route("/hello", get(hello))
///     .route_layer(middleware::from_fn_with_state(gate.clone(), require_auth));
/// ```
pub async fn require_auth(State(gate): State<Gate>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();
    let view = request_view(&mut parts).await;
    let config = gate.pipeline().config();

    match gate.pipeline().authenticate(&view).await {
        Ok(authenticated) => {
            let echo = config
                .send_authorization
                .then(|| format!("{} {}", config.token_head_name, authenticated.token))
                .and_then(|value| HeaderValue::from_str(&value).ok());

            parts.extensions.insert(authenticated);
            let mut response = next.run(Request::from_parts(parts, body)).await;

            if let Some(value) = echo {
                response.headers_mut().insert(header::AUTHORIZATION, value);
            }
            response
        }
        Err(err) => {
            let status = err.status();
            let message = gate.pipeline().format_error(&err, &view);

            if status.is_server_error() {
                warn!(error = %err, "Authentication failed");
            } else {
                debug!(error = %err, status = status.as_u16(), "Request rejected");
            }

            if !config.disable_abort {
                return gate.unauthorized(status, &message);
            }

            parts.extensions.insert(AuthRejection { status, message });
            let mut response = next.run(Request::from_parts(parts, body)).await;

            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, gate.challenge());
            response
        }
    }
}

/// Extractor for the result of [`require_auth`].
///
/// Rejects with the recorded [`AuthRejection`] when aborting is disabled, and
/// with `401` when the route is not behind the middleware.
#[derive(Debug, Clone)]
pub struct AuthContext(pub Authenticated);

impl AuthContext {
    pub fn token(&self) -> &str {
        &self.0.token
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.0.claims
    }

    pub fn identity(&self) -> Option<&Value> {
        self.0.identity.as_ref()
    }

    /// A caller-defined claim.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.0.claims.get(name)
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(authenticated) = parts.extensions.get::<Authenticated>() {
            return Ok(Self(authenticated.clone()));
        }

        match parts.extensions.get::<AuthRejection>() {
            Some(rejection) => Err(AppError::new(
                rejection.status,
                anyhow::anyhow!(rejection.message.clone()),
            )),
            None => Err(AppError::unauthorized(anyhow::anyhow!(
                "request was not authenticated"
            ))),
        }
    }
}

impl<S> OptionalFromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Authenticated>().cloned().map(Self))
    }
}
