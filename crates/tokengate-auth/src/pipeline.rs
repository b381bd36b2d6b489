//! Per-request authentication.
//!
//! [`AuthPipeline`] owns the immutable configuration, the signer, the token
//! locator, the revocation store and every host collaborator. It is cheap to
//! clone and is shared by all requests.
//!
//! The authentication order is fixed:
//!
//! 1. locate the token
//! 2. verify algorithm and signature
//! 3. parse claims and check `exp` against the pipeline clock
//! 4. reject revoked tokens
//! 5. derive the identity
//! 6. authorize

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokengate_cache::{MemoryCache, TtlCache, keys};
use tokengate_config::JwtConfig;
use tokengate_core::{AuthError, Clock, ConfigError, SystemClock};
use tracing::{debug, instrument};

use crate::capabilities::{
    AllowAll, Authenticator, Authorizator, ClaimIdentity, DefaultPayload, DisplayMessage,
    IdentityResolver, MessageFormatter, PayloadBuilder,
};
use crate::claims::TokenClaims;
use crate::locator::TokenLocator;
use crate::request::RequestView;
use crate::revocation::RevocationStore;
use crate::signer::Signer;

/// Outcome of a successful [`AuthPipeline::authenticate`].
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// The raw token as presented.
    pub token: String,
    pub claims: TokenClaims,
    pub identity: Option<Value>,
}

#[derive(Clone)]
pub struct AuthPipeline {
    pub(crate) config: Arc<JwtConfig>,
    pub(crate) signer: Arc<Signer>,
    pub(crate) locator: Arc<TokenLocator>,
    pub(crate) store: RevocationStore,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) authenticator: Option<Arc<dyn Authenticator>>,
    pub(crate) authorizator: Arc<dyn Authorizator>,
    pub(crate) identity: Arc<dyn IdentityResolver>,
    pub(crate) payload: Arc<dyn PayloadBuilder>,
    pub(crate) formatter: Arc<dyn MessageFormatter>,
}

impl fmt::Debug for AuthPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthPipeline")
            .field("realm", &self.config.realm)
            .field("signer", &self.signer)
            .field("locator", &self.locator)
            .field("store", &self.store)
            .field("has_authenticator", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthPipeline {
    pub fn builder(config: JwtConfig) -> AuthPipelineBuilder {
        AuthPipelineBuilder::new(config)
    }

    /// Runs the full authentication sequence for one request.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; see [`AuthError::status`] for
    /// the status each one maps to.
    #[instrument(skip_all, fields(realm = %self.config.realm))]
    pub async fn authenticate(&self, request: &RequestView) -> Result<Authenticated, AuthError> {
        let token = self.locator.locate(request)?;
        let claims = self.parse_token(&token)?;

        if claims.is_expired_at(self.clock.now()) {
            debug!(exp = claims.exp, "Rejected expired token");
            return Err(AuthError::ExpiredToken);
        }

        if self.store.is_revoked(&token).await {
            debug!("Rejected revoked token");
            return Err(AuthError::InvalidToken);
        }

        let identity = self.identity.resolve(&claims, request);

        if !self.authorizator.authorize(identity.as_ref(), request) {
            debug!("Identity not authorized");
            return Err(AuthError::Forbidden);
        }

        Ok(Authenticated {
            token,
            claims,
            identity,
        })
    }

    /// Verifies `token` and parses its claims without any temporal check.
    ///
    /// # Errors
    ///
    /// Signature errors from [`Signer::verify`] and `exp` structure errors
    /// from [`TokenClaims::from_map`].
    pub fn parse_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let map = self.signer.verify(token)?;
        TokenClaims::from_map(map, &self.config.identity_key)
    }

    /// Message to report for a rejection, produced by the configured formatter.
    pub fn format_error(&self, error: &AuthError, request: &RequestView) -> String {
        self.formatter.format(error, request)
    }

    /// Value of the `WWW-Authenticate` header sent with every rejection.
    pub fn challenge(&self) -> String {
        format!("JWT realm=\"{}\"", self.config.realm)
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn store(&self) -> &RevocationStore {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

/// Assembles an [`AuthPipeline`], falling back to defaults for every
/// collaborator that is not set.
pub struct AuthPipelineBuilder {
    config: JwtConfig,
    cache: Option<Arc<dyn TtlCache>>,
    key_prefix: String,
    clock: Option<Arc<dyn Clock>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    authorizator: Option<Arc<dyn Authorizator>>,
    identity: Option<Arc<dyn IdentityResolver>>,
    payload: Option<Arc<dyn PayloadBuilder>>,
    formatter: Option<Arc<dyn MessageFormatter>>,
}

impl AuthPipelineBuilder {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            config,
            cache: None,
            key_prefix: keys::DEFAULT_PREFIX.to_string(),
            clock: None,
            authenticator: None,
            authorizator: None,
            identity: None,
            payload: None,
            formatter: None,
        }
    }

    /// Backend for revocation records. Defaults to a [`MemoryCache`].
    pub fn cache(mut self, cache: Arc<dyn TtlCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    pub fn authorizator(mut self, authorizator: impl Authorizator + 'static) -> Self {
        self.authorizator = Some(Arc::new(authorizator));
        self
    }

    pub fn identity_resolver(mut self, resolver: impl IdentityResolver + 'static) -> Self {
        self.identity = Some(Arc::new(resolver));
        self
    }

    pub fn payload_builder(mut self, builder: impl PayloadBuilder + 'static) -> Self {
        self.payload = Some(Arc::new(builder));
        self
    }

    pub fn message_formatter(mut self, formatter: impl MessageFormatter + 'static) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the key material cannot be turned into a signer.
    pub fn build(self) -> Result<AuthPipeline, ConfigError> {
        let signer = Signer::from_config(&self.config)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::with_clock(clock.clone())));
        let store = RevocationStore::new(
            cache,
            self.key_prefix,
            self.config.max_refresh,
            clock.clone(),
        );
        let locator = TokenLocator::from_config(&self.config);

        Ok(AuthPipeline {
            config: Arc::new(self.config),
            signer: Arc::new(signer),
            locator: Arc::new(locator),
            store,
            clock,
            authenticator: self.authenticator,
            authorizator: self.authorizator.unwrap_or_else(|| Arc::new(AllowAll)),
            identity: self.identity.unwrap_or_else(|| Arc::new(ClaimIdentity)),
            payload: self.payload.unwrap_or_else(|| Arc::new(DefaultPayload)),
            formatter: self.formatter.unwrap_or_else(|| Arc::new(DisplayMessage)),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{Map, json};
    use tokengate_core::{LocateError, ManualClock};

    pub(crate) const SECRET: &str = "test-secret-key-at-least-32-characters-long";
    pub(crate) const START: i64 = 1_700_000_000;

    pub(crate) fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.timestamp_opt(START, 0).unwrap()))
    }

    pub(crate) fn config(max_refresh: Duration) -> JwtConfig {
        JwtConfig::builder()
            .secret(SECRET)
            .timeout(Duration::hours(1))
            .max_refresh(max_refresh)
            .build()
            .unwrap()
    }

    pub(crate) fn pipeline(clock: Arc<ManualClock>) -> AuthPipeline {
        AuthPipeline::builder(config(Duration::hours(1)))
            .clock(clock)
            .build()
            .unwrap()
    }

    fn bearer(token: &str) -> RequestView {
        RequestView::new().with_header("Authorization", format!("Bearer {token}"))
    }

    fn sign_raw(pipeline: &AuthPipeline, claims: Value) -> String {
        pipeline.signer().sign(&claims).unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_valid_token() {
        let pipeline = pipeline(manual_clock());
        let issued = pipeline.generate(&json!({"identity": "admin", "role": "ops"})).unwrap();

        let authenticated = pipeline.authenticate(&bearer(&issued.token)).await.unwrap();
        assert_eq!(authenticated.token, issued.token);
        assert_eq!(authenticated.identity, Some(json!("admin")));
        assert_eq!(authenticated.claims.get("role"), Some(&json!("ops")));
    }

    #[tokio::test]
    async fn test_missing_token() {
        let pipeline = pipeline(manual_clock());
        let err = pipeline.authenticate(&RequestView::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::Location(LocateError::NoToken)));
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let pipeline = pipeline(manual_clock());

        let at_now = sign_raw(&pipeline, json!({"identity": "u", "exp": START}));
        let err = pipeline.authenticate(&bearer(&at_now)).await.unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken));

        let one_later = sign_raw(&pipeline, json!({"identity": "u", "exp": START + 1}));
        assert!(pipeline.authenticate(&bearer(&one_later)).await.is_ok());
    }

    #[tokio::test]
    async fn test_exp_structure_errors() {
        let pipeline = pipeline(manual_clock());

        let missing = sign_raw(&pipeline, json!({"identity": "u"}));
        let err = pipeline.authenticate(&bearer(&missing)).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingExpField));
        assert_eq!(err.status().as_u16(), 400);

        let malformed = sign_raw(&pipeline, json!({"identity": "u", "exp": "soon"}));
        let err = pipeline.authenticate(&bearer(&malformed)).await.unwrap_err();
        assert!(matches!(err, AuthError::WrongFormatOfExp));
    }

    #[tokio::test]
    async fn test_revoked_token_is_invalid() {
        let pipeline = pipeline(manual_clock());
        let issued = pipeline.generate(&json!("admin")).unwrap();

        pipeline.store().revoke(&issued.token, &issued.claims).await.unwrap();

        let err = pipeline.authenticate(&bearer(&issued.token)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_authorizator_forbids() {
        let pipeline = AuthPipeline::builder(config(Duration::zero()))
            .clock(manual_clock())
            .authorizator(|identity: Option<&Value>, _: &RequestView| {
                identity.is_some_and(|id| id == "admin")
            })
            .build()
            .unwrap();

        let admin = pipeline.generate(&json!("admin")).unwrap();
        assert!(pipeline.authenticate(&bearer(&admin.token)).await.is_ok());

        let guest = pipeline.generate(&json!("guest")).unwrap();
        let err = pipeline.authenticate(&bearer(&guest.token)).await.unwrap_err();
        assert!(matches!(err, AuthError::Forbidden));
    }

    #[tokio::test]
    async fn test_custom_identity_resolver() {
        struct RoleIdentity;

        impl IdentityResolver for RoleIdentity {
            fn resolve(&self, claims: &TokenClaims, _: &RequestView) -> Option<Value> {
                claims.get("role").cloned()
            }
        }

        let pipeline = AuthPipeline::builder(config(Duration::zero()))
            .clock(manual_clock())
            .identity_resolver(RoleIdentity)
            .build()
            .unwrap();

        let issued = pipeline
            .generate(&json!({"identity": "u1", "role": "editor"}))
            .unwrap();
        let authenticated = pipeline.authenticate(&bearer(&issued.token)).await.unwrap();
        assert_eq!(authenticated.identity, Some(json!("editor")));
    }

    #[test]
    fn test_custom_payload_builder() {
        let pipeline = AuthPipeline::builder(config(Duration::zero()))
            .clock(manual_clock())
            .payload_builder(|data: &Value, key: &str| {
                let mut map = Map::new();
                map.insert(key.to_string(), data["id"].clone());
                map.insert("name".into(), data["name"].clone());
                map
            })
            .build()
            .unwrap();

        let issued = pipeline
            .generate(&json!({"id": 7, "name": "ada", "password": "secret"}))
            .unwrap();

        assert_eq!(issued.claims.identity, Some(json!(7)));
        assert_eq!(issued.claims.get("name"), Some(&json!("ada")));
        assert!(issued.claims.get("password").is_none());
    }

    #[test]
    fn test_challenge_header() {
        let pipeline = pipeline(manual_clock());
        assert_eq!(pipeline.challenge(), "JWT realm=\"tokengate\"");
    }

    #[test]
    fn test_asymmetric_pipeline_builds() {
        let dir = fixture_dir();
        let config = JwtConfig::builder()
            .algorithm(tokengate_config::SigningAlgorithm::RS256)
            .key_files(dir.join("private.pem"), dir.join("public.pem"))
            .build()
            .unwrap();

        let pipeline = AuthPipeline::builder(config).build().unwrap();
        assert!(matches!(pipeline.signer(), Signer::Asymmetric { .. }));
    }

    fn fixture_dir() -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }
}
