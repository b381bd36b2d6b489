use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use tokengate_auth::{AuthPipeline, AuthPipelineBuilder, RequestView};
use tokengate_cache::{CacheConfig, open_cache};
use tokengate_config::JwtConfig;
use tokengate_core::{AuthError, Clock, SystemClock};
use tracing::info;

use crate::render::{JsonRenderer, ResponseRenderer};

/// Router state shared by the middleware and the token handlers.
#[derive(Clone)]
pub struct Gate {
    pipeline: AuthPipeline,
    renderer: Arc<dyn ResponseRenderer>,
    challenge: HeaderValue,
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Gate {
    pub fn new(pipeline: AuthPipeline) -> Self {
        // `JwtConfigBuilder::build` only accepts header-safe realms.
        let challenge = HeaderValue::from_str(&pipeline.challenge())
            .unwrap_or_else(|_| HeaderValue::from_static("JWT"));
        Self {
            pipeline,
            renderer: Arc::new(JsonRenderer),
            challenge,
        }
    }

    pub fn with_renderer(mut self, renderer: impl ResponseRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Loads `.env`, then builds the pipeline from `JWT_*` and `CACHE_*` variables.
    ///
    /// `configure` installs the host collaborators (authenticator, authorizator, ...).
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when the Redis backend cannot connect.
    pub async fn from_env<F>(configure: F) -> anyhow::Result<Self>
    where
        F: FnOnce(AuthPipelineBuilder) -> AuthPipelineBuilder,
    {
        dotenvy::dotenv().ok();

        let jwt_config = JwtConfig::from_env().context("invalid JWT configuration")?;
        let cache_config = CacheConfig::from_env().context("invalid cache configuration")?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let cache = open_cache(&cache_config, clock.clone())
            .await
            .context("failed to open revocation cache")?;

        info!(
            realm = %jwt_config.realm,
            algorithm = %jwt_config.algorithm,
            backend = ?cache_config.backend,
            "Token gate configured"
        );

        let builder = AuthPipeline::builder(jwt_config)
            .cache(cache)
            .key_prefix(cache_config.key_prefix)
            .clock(clock);

        Ok(Self::new(configure(builder).build()?))
    }

    pub fn pipeline(&self) -> &AuthPipeline {
        &self.pipeline
    }

    pub fn renderer(&self) -> &dyn ResponseRenderer {
        self.renderer.as_ref()
    }

    /// `WWW-Authenticate` value for this realm.
    pub fn challenge(&self) -> HeaderValue {
        self.challenge.clone()
    }

    /// Renders a rejection with the challenge header attached.
    pub fn unauthorized(&self, status: StatusCode, message: &str) -> Response {
        let mut response = self.renderer.unauthorized(status, message);
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, self.challenge());
        response
    }

    /// [`Gate::unauthorized`] for an engine error, using the configured message formatter.
    pub fn reject(&self, error: &AuthError, request: &RequestView) -> Response {
        let message = self.pipeline.format_error(error, request);
        self.unauthorized(error.status(), &message)
    }
}
