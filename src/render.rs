//! Response hooks for rejections and the login, refresh and logout flows.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;

/// Renders every response the gate produces itself.
///
/// The `WWW-Authenticate` challenge header and the token cookie are added by
/// the caller, so implementations only decide status and body.
pub trait ResponseRenderer: Send + Sync {
    fn unauthorized(&self, status: StatusCode, message: &str) -> Response;

    fn login(&self, token: &str, expire: DateTime<Utc>) -> Response;

    fn refresh(&self, token: &str, expire: DateTime<Utc>) -> Response {
        self.login(token, expire)
    }

    fn logout(&self, status: StatusCode) -> Response;
}

/// `{"code", "message"}` for rejections and `{"code", "token", "expire"}` for
/// issued tokens, with `expire` in RFC 3339.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl ResponseRenderer for JsonRenderer {
    fn unauthorized(&self, status: StatusCode, message: &str) -> Response {
        let body = Json(json!({
            "code": status.as_u16(),
            "message": message,
        }));

        (status, body).into_response()
    }

    fn login(&self, token: &str, expire: DateTime<Utc>) -> Response {
        Json(json!({
            "code": StatusCode::OK.as_u16(),
            "token": token,
            "expire": expire.to_rfc3339_opts(SecondsFormat::Secs, true),
        }))
        .into_response()
    }

    fn logout(&self, status: StatusCode) -> Response {
        (status, Json(json!({ "code": status.as_u16() }))).into_response()
    }
}
