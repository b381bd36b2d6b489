use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs};

use chrono::{Duration, Utc};
use tokengate_core::ConfigError;

use crate::cookie::CookieConfig;
use crate::lookup::TokenLookup;

pub const DEFAULT_REALM: &str = "tokengate";
pub const DEFAULT_IDENTITY_KEY: &str = "identity";
pub const DEFAULT_TOKEN_HEAD_NAME: &str = "Bearer";

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SigningAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
}

impl SigningAlgorithm {
    /// `true` for the RSA family, which signs with a private key and verifies
    /// with a public key.
    pub fn is_asymmetric(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384 | Self::RS512)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            other => Err(ConfigError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key material for the configured algorithm, loaded once.
#[derive(Clone)]
pub enum KeyMaterial {
    /// Shared secret for the HMAC family.
    Secret(Vec<u8>),
    /// PEM-encoded RSA key pair read from the configured key files.
    RsaPem {
        private_pem: Vec<u8>,
        public_pem: Vec<u8>,
    },
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret(_) => f.write_str("Secret(..)"),
            Self::RsaPem { .. } => f.write_str("RsaPem(..)"),
        }
    }
}

/// Immutable engine configuration.
///
/// # Environment Variables
///
/// - `JWT_REALM` (default `tokengate`)
/// - `JWT_ALGORITHM` (default `HS256`)
/// - `JWT_SECRET` (required for HS*)
/// - `JWT_PRIVATE_KEY_FILE` / `JWT_PUBLIC_KEY_FILE` (required for RS*)
/// - `JWT_TIMEOUT_SECS` (default `3600`)
/// - `JWT_MAX_REFRESH_SECS` (default `0`)
/// - `JWT_TOKEN_LOOKUP` (default `header:Authorization`)
/// - `JWT_TOKEN_HEAD_NAME` (default `Bearer`)
/// - `JWT_IDENTITY_KEY` (default `identity`)
/// - `JWT_SEND_COOKIE`, `JWT_COOKIE_NAME`, `JWT_COOKIE_DOMAIN`,
///   `JWT_SECURE_COOKIE`, `JWT_COOKIE_HTTP_ONLY`
/// - `JWT_SEND_AUTHORIZATION`, `JWT_DISABLE_ABORT`
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub realm: String,
    pub algorithm: SigningAlgorithm,
    pub key: KeyMaterial,
    /// Lifetime of an issued token.
    pub timeout: Duration,
    /// Extra time after `iat` during which an expired token may still be refreshed.
    pub max_refresh: Duration,
    pub lookup: TokenLookup,
    pub token_head_name: String,
    pub identity_key: String,
    pub cookie: CookieConfig,
    /// Echo `Authorization: <head> <token>` on every authenticated response.
    pub send_authorization: bool,
    /// Keep running the request chain after a rejection.
    pub disable_abort: bool,
}

impl JwtConfig {
    pub fn builder() -> JwtConfigBuilder {
        JwtConfigBuilder::default()
    }

    /// Loads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Fails if the key material for the selected algorithm is missing or
    /// unreadable, or if any variable holds an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(realm) = var("JWT_REALM") {
            builder = builder.realm(realm);
        }
        if let Some(alg) = var("JWT_ALGORITHM") {
            builder = builder.algorithm(alg.parse()?);
        }
        if let Some(secret) = var("JWT_SECRET") {
            builder = builder.secret(secret);
        }
        if let (Some(private), Some(public)) =
            (var("JWT_PRIVATE_KEY_FILE"), var("JWT_PUBLIC_KEY_FILE"))
        {
            builder = builder.key_files(private, public);
        }
        if let Some(timeout) = parse_seconds(&var, "JWT_TIMEOUT_SECS")? {
            builder = builder.timeout(timeout);
        }
        if let Some(max_refresh) = parse_seconds(&var, "JWT_MAX_REFRESH_SECS")? {
            builder = builder.max_refresh(max_refresh);
        }
        if let Some(lookup) = var("JWT_TOKEN_LOOKUP") {
            builder = builder.token_lookup(lookup);
        }
        if let Some(head) = var("JWT_TOKEN_HEAD_NAME") {
            builder = builder.token_head_name(head);
        }
        if let Some(key) = var("JWT_IDENTITY_KEY") {
            builder = builder.identity_key(key);
        }

        let defaults = CookieConfig::default();
        builder = builder.cookie(CookieConfig {
            send_cookie: parse_flag(&var, "JWT_SEND_COOKIE")?.unwrap_or(defaults.send_cookie),
            name: var("JWT_COOKIE_NAME").unwrap_or(defaults.name),
            domain: var("JWT_COOKIE_DOMAIN").filter(|d| !d.is_empty()),
            secure: parse_flag(&var, "JWT_SECURE_COOKIE")?.unwrap_or(defaults.secure),
            http_only: parse_flag(&var, "JWT_COOKIE_HTTP_ONLY")?.unwrap_or(defaults.http_only),
        });

        if let Some(flag) = parse_flag(&var, "JWT_SEND_AUTHORIZATION")? {
            builder = builder.send_authorization(flag);
        }
        if let Some(flag) = parse_flag(&var, "JWT_DISABLE_ABORT")? {
            builder = builder.disable_abort(flag);
        }

        builder.build()
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}

fn parse_seconds<F>(var: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<i64, _>(var, key)? {
        None => Ok(None),
        Some(secs) => Duration::try_seconds(secs)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                value: secs.to_string(),
            }),
    }
}

fn parse_flag<F>(var: &F, key: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(None),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        },
    }
}

/// Builder for [`JwtConfig`]. Validation happens in [`JwtConfigBuilder::build`].
#[derive(Debug, Default)]
pub struct JwtConfigBuilder {
    realm: Option<String>,
    algorithm: SigningAlgorithm,
    secret: Option<Vec<u8>>,
    key_files: Option<(PathBuf, PathBuf)>,
    timeout: Option<Duration>,
    max_refresh: Option<Duration>,
    lookup: Option<String>,
    token_head_name: Option<String>,
    identity_key: Option<String>,
    cookie: CookieConfig,
    send_authorization: bool,
    disable_abort: bool,
}

impl JwtConfigBuilder {
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    pub fn algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn secret(mut self, secret: impl AsRef<[u8]>) -> Self {
        self.secret = Some(secret.as_ref().to_vec());
        self
    }

    pub fn key_files(mut self, private: impl AsRef<Path>, public: impl AsRef<Path>) -> Self {
        self.key_files = Some((private.as_ref().to_path_buf(), public.as_ref().to_path_buf()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_refresh(mut self, max_refresh: Duration) -> Self {
        self.max_refresh = Some(max_refresh);
        self
    }

    pub fn token_lookup(mut self, lookup: impl Into<String>) -> Self {
        self.lookup = Some(lookup.into());
        self
    }

    pub fn token_head_name(mut self, head: impl Into<String>) -> Self {
        self.token_head_name = Some(head.into());
        self
    }

    pub fn identity_key(mut self, key: impl Into<String>) -> Self {
        self.identity_key = Some(key.into());
        self
    }

    pub fn cookie(mut self, cookie: CookieConfig) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn send_authorization(mut self, enabled: bool) -> Self {
        self.send_authorization = enabled;
        self
    }

    pub fn disable_abort(mut self, disabled: bool) -> Self {
        self.disable_abort = disabled;
        self
    }

    /// Validates the combination and loads key material.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingSecretKey`] for HS* without a non-empty secret
    /// - [`ConfigError::MissingKeyFiles`] for RS* without key files
    /// - [`ConfigError::NoPrivateKeyFile`] / [`ConfigError::NoPublicKeyFile`] if a
    ///   key file cannot be read
    /// - lookup rule errors from [`TokenLookup::parse`]
    /// - [`ConfigError::InvalidValue`] for a realm that cannot be quoted in a
    ///   header, or a timeout or refresh window too large to add to the clock
    pub fn build(self) -> Result<JwtConfig, ConfigError> {
        let realm = non_empty_or(self.realm, DEFAULT_REALM);
        if !is_quotable(&realm) {
            return Err(ConfigError::InvalidValue {
                key: "realm".to_string(),
                value: realm,
            });
        }

        let key = if self.algorithm.is_asymmetric() {
            let (private, public) = self
                .key_files
                .ok_or_else(|| ConfigError::MissingKeyFiles(self.algorithm.to_string()))?;
            let private_pem = fs::read(&private).map_err(|source| ConfigError::NoPrivateKeyFile {
                path: private.clone(),
                source,
            })?;
            let public_pem = fs::read(&public).map_err(|source| ConfigError::NoPublicKeyFile {
                path: public.clone(),
                source,
            })?;
            KeyMaterial::RsaPem {
                private_pem,
                public_pem,
            }
        } else {
            match self.secret {
                Some(secret) if !secret.is_empty() => KeyMaterial::Secret(secret),
                _ => return Err(ConfigError::MissingSecretKey),
            }
        };

        let lookup = match self.lookup {
            Some(spec) => TokenLookup::parse(&spec)?,
            None => TokenLookup::default(),
        };

        let token_head_name = self
            .token_head_name
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_HEAD_NAME.to_string());

        let timeout = self
            .timeout
            .filter(|t| *t > Duration::zero())
            .unwrap_or_else(|| Duration::hours(1));

        let max_refresh = self
            .max_refresh
            .filter(|r| *r > Duration::zero())
            .unwrap_or_else(Duration::zero);

        let now = Utc::now();
        if now.checked_add_signed(timeout).is_none() {
            return Err(out_of_range("timeout", timeout));
        }
        if now.checked_add_signed(max_refresh).is_none()
            || now.checked_sub_signed(max_refresh).is_none()
        {
            return Err(out_of_range("max_refresh", max_refresh));
        }

        Ok(JwtConfig {
            realm,
            algorithm: self.algorithm,
            key,
            timeout,
            max_refresh,
            lookup,
            token_head_name,
            identity_key: non_empty_or(self.identity_key, DEFAULT_IDENTITY_KEY),
            cookie: CookieConfig {
                name: non_empty_or(Some(self.cookie.name.clone()), "jwt"),
                ..self.cookie
            },
            send_authorization: self.send_authorization,
            disable_abort: self.disable_abort,
        })
    }
}

/// Printable ASCII without the characters that would end a quoted string.
fn is_quotable(value: &str) -> bool {
    value
        .chars()
        .all(|c| (c == ' ' || c.is_ascii_graphic()) && c != '"' && c != '\\')
}

fn out_of_range(key: &str, value: Duration) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: format!("{}s", value.num_seconds()),
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
