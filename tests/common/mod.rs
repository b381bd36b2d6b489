#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::{Json, Router, routing::get};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokengate::Gate;
use tokengate::middleware::auth::{AuthContext, AuthRejection};
use tokengate::router::init_router;
use tokengate::tokengate_auth::{
    AuthPipeline, AuthPipelineBuilder, Authenticator, LoginCredentials, RequestView,
};
use tokengate::tokengate_config::{JwtConfig, JwtConfigBuilder};
use tokengate::tokengate_core::{AuthError, ManualClock};

pub const SECRET: &str = "test-secret-key-at-least-32-characters-long";
pub const START: i64 = 1_700_000_000;

pub struct TestUsers;

#[async_trait]
impl Authenticator for TestUsers {
    async fn authenticate(&self, _: &RequestView, body: &Value) -> Result<Value, AuthError> {
        let credentials = LoginCredentials::from_body(body)?;
        match (credentials.username.as_str(), credentials.password.as_str()) {
            ("admin", "admin") => Ok(json!({"identity": "admin", "role": "admin"})),
            ("guest", "guest") => Ok(json!({"identity": "guest", "role": "guest"})),
            _ => Err(AuthError::failed_authentication(anyhow::anyhow!(
                "incorrect username or password"
            ))),
        }
    }
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.timestamp_opt(START, 0).unwrap()))
}

/// HS256 config with a one hour lifetime and a one hour refresh window.
pub fn config() -> JwtConfigBuilder {
    JwtConfig::builder()
        .secret(SECRET)
        .timeout(Duration::hours(1))
        .max_refresh(Duration::hours(1))
        .token_lookup("header:Authorization, query:token, cookie:jwt")
}

async fn hello(auth: AuthContext) -> Json<Value> {
    Json(json!({
        "identity": auth.identity(),
        "role": auth.claim("role"),
    }))
}

async fn status(rejection: Option<axum::Extension<AuthRejection>>) -> Json<Value> {
    Json(json!({
        "rejected": rejection.map(|axum::Extension(r)| r.message),
    }))
}

pub fn protected_routes() -> Router<Gate> {
    Router::new()
        .route("/user/hello", get(hello))
        .route("/user/status", get(status))
}

pub fn build_app<F>(config: JwtConfigBuilder, clock: Arc<ManualClock>, customize: F) -> Router
where
    F: FnOnce(AuthPipelineBuilder) -> AuthPipelineBuilder,
{
    let builder = AuthPipeline::builder(config.build().unwrap())
        .clock(clock)
        .authenticator(TestUsers);
    let gate = Gate::new(customize(builder).build().unwrap());
    init_router(gate, protected_routes())
}

pub fn app(clock: Arc<ManualClock>) -> Router {
    build_app(config(), clock, |builder| builder)
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&json!({
                "username": username,
                "password": password
            }))
            .unwrap(),
        ))
        .unwrap()
}

pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
