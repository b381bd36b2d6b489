//! Login, refresh and logout endpoints.
//!
//! All three answer through the gate's [`crate::render::ResponseRenderer`]; a
//! failure is rendered exactly like a middleware rejection.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::Value;
use tokengate_auth::IssuedToken;
use tracing::instrument;

use crate::request::RequestSnapshot;
use crate::state::Gate;

/// `POST /login`. The body is handed to the authenticator as JSON; an empty or
/// non-JSON body is passed as `null`.
#[instrument(skip_all)]
pub async fn login(
    State(gate): State<Gate>,
    RequestSnapshot(view): RequestSnapshot,
    jar: CookieJar,
    body: Bytes,
) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    match gate.pipeline().login(&view, &body).await {
        Ok(issued) => {
            let response = gate.renderer().login(&issued.token, issued.expires_at);
            (with_token_cookie(&gate, jar, &issued), response).into_response()
        }
        Err(err) => gate.reject(&err, &view),
    }
}

/// Exchanges the presented token for a fresh one and revokes the old token.
#[instrument(skip_all)]
pub async fn refresh(
    State(gate): State<Gate>,
    RequestSnapshot(view): RequestSnapshot,
    jar: CookieJar,
) -> Response {
    match gate.pipeline().refresh(&view).await {
        Ok(issued) => {
            let response = gate.renderer().refresh(&issued.token, issued.expires_at);
            (with_token_cookie(&gate, jar, &issued), response).into_response()
        }
        Err(err) => gate.reject(&err, &view),
    }
}

/// Revokes the presented token and, when cookies are enabled, expires the cookie.
#[instrument(skip_all)]
pub async fn logout(
    State(gate): State<Gate>,
    RequestSnapshot(view): RequestSnapshot,
    jar: CookieJar,
) -> Response {
    match gate.pipeline().logout(&view).await {
        Ok(()) => {
            let cookie = &gate.pipeline().config().cookie;
            let jar = if cookie.send_cookie {
                jar.remove(Cookie::build((cookie.name.clone(), "")).path("/"))
            } else {
                jar
            };
            (jar, gate.renderer().logout(StatusCode::OK)).into_response()
        }
        Err(err) => gate.reject(&err, &view),
    }
}

fn with_token_cookie(gate: &Gate, jar: CookieJar, issued: &IssuedToken) -> CookieJar {
    let config = &gate.pipeline().config().cookie;
    if !config.send_cookie {
        return jar;
    }

    let max_age = (issued.expires_at - gate.pipeline().clock().now())
        .num_seconds()
        .max(0);

    let mut cookie = Cookie::build((config.name.clone(), issued.token.clone()))
        .path("/")
        .max_age(time::Duration::seconds(max_age))
        .secure(config.secure)
        .http_only(config.http_only);

    if let Some(domain) = &config.domain {
        cookie = cookie.domain(domain.clone());
    }

    jar.add(cookie)
}
