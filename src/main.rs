use async_trait::async_trait;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tokengate::logging::init_logging;
use tokengate::middleware::auth::AuthContext;
use tokengate::router::init_router;
use tokengate::tokengate_auth::{Authenticator, LoginCredentials, RequestView};
use tokengate::tokengate_core::AuthError;
use tokengate::Gate;
use tracing::info;

/// Accepts the single account `admin` / `admin`.
struct DemoUsers;

#[async_trait]
impl Authenticator for DemoUsers {
    async fn authenticate(&self, _request: &RequestView, body: &Value) -> Result<Value, AuthError> {
        let credentials = LoginCredentials::from_body(body)?;

        if credentials.username == "admin" && credentials.password == "admin" {
            Ok(json!({ "identity": credentials.username, "username": credentials.username }))
        } else {
            Err(AuthError::failed_authentication(anyhow::anyhow!(
                "incorrect username or password"
            )))
        }
    }
}

async fn hello(auth: AuthContext) -> Json<Value> {
    Json(json!({
        "identity": auth.identity(),
        "username": auth.claim("username"),
        "text": "Hello World.",
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let gate = Gate::from_env(|builder| builder.authenticator(DemoUsers)).await?;
    let app = init_router(gate, Router::new().route("/user/hello", get(hello)));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Server running");

    axum::serve(listener, app).await?;
    Ok(())
}
