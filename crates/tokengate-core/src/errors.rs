//! Error taxonomy for token configuration, location and authentication.
//!
//! Three layers of errors exist:
//!
//! - [`ConfigError`]: fatal problems detected while building the engine (missing secret,
//!   unreadable key files, malformed lookup rules). Never produced at request time.
//! - [`LocateError`]: why no token could be extracted from a request.
//! - [`AuthError`]: every request-time failure, each mapped to an HTTP status by
//!   [`AuthError::status`].

use axum::http::StatusCode;
use std::path::PathBuf;

/// Errors raised while building configuration or key material.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("secret key is required")]
    MissingSecretKey,

    #[error("private key file unreadable: {path}")]
    NoPrivateKeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("public key file unreadable: {path}")]
    NoPublicKeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("private key invalid: {0}")]
    InvalidPrivateKey(String),

    #[error("public key invalid: {0}")]
    InvalidPublicKey(String),

    #[error("key files are required for asymmetric algorithm {0}")]
    MissingKeyFiles(String),

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("malformed token lookup rule: {0:?}")]
    MalformedLookupRule(String),

    #[error("unknown token lookup source: {0:?}")]
    UnknownLookupSource(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Reasons a token could not be located in a request.
///
/// Each source has its own kind so that a header with the wrong scheme is
/// distinguishable from a header that is simply absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("auth header is empty")]
    EmptyAuthHeader,

    #[error("auth header is invalid")]
    InvalidAuthHeader,

    #[error("query token is empty")]
    EmptyQueryToken,

    #[error("cookie token is empty")]
    EmptyCookieToken,

    #[error("parameter token is empty")]
    EmptyParamToken,

    #[error("no token present in request")]
    NoToken,
}

/// Request-time authentication failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Location(#[from] LocateError),

    #[error("invalid signing algorithm")]
    InvalidSigningAlgorithm,

    #[error("signature is invalid")]
    InvalidSignature,

    #[error("token is malformed: {0}")]
    MalformedToken(String),

    #[error("missing exp field")]
    MissingExpField,

    #[error("exp must be a numeric timestamp")]
    WrongFormatOfExp,

    #[error("missing iat field")]
    MissingIssuedAt,

    #[error("token is expired")]
    ExpiredToken,

    #[error("token is expired beyond the refresh window")]
    RefreshWindowExceeded,

    /// The token has been revoked (logged out or refreshed away).
    #[error("invalid token")]
    InvalidToken,

    /// The token is already past the point where revoking it matters.
    #[error("token is past its revocation window")]
    RevocationWindowElapsed,

    #[error("revocation store error: {0}")]
    RevocationStore(#[source] anyhow::Error),

    #[error("you don't have permission to access this resource")]
    Forbidden,

    #[error("missing identity")]
    MissingIdentity,

    #[error("authenticator is not configured")]
    MissingAuthenticator,

    #[error("missing username or password")]
    MissingLoginValues,

    #[error("{0}")]
    FailedAuthentication(#[source] anyhow::Error),

    #[error("failed to create token")]
    FailedTokenCreation,
}

impl AuthError {
    /// HTTP status reported to the unauthorized responder for this error.
    ///
    /// Structurally invalid claims are `400`, authorization failures `403`,
    /// engine usage errors `500`, and everything else `401`.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingExpField | Self::WrongFormatOfExp | Self::MissingIssuedAt => {
                StatusCode::BAD_REQUEST
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::MissingIdentity | Self::MissingAuthenticator => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn failed_authentication<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::FailedAuthentication(err.into())
    }

    pub fn revocation_store<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::RevocationStore(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_errors_are_bad_request() {
        assert_eq!(AuthError::MissingExpField.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::WrongFormatOfExp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::MissingIssuedAt.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_expired_is_unauthorized_not_bad_request() {
        let err = AuthError::ExpiredToken;
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_refresh_window_is_distinct_from_expiry() {
        let err = AuthError::RefreshWindowExceeded;
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_ne!(err.to_string(), AuthError::ExpiredToken.to_string());
    }

    #[test]
    fn test_forbidden_status() {
        assert_eq!(AuthError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_usage_errors_are_internal() {
        assert_eq!(
            AuthError::MissingIdentity.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::MissingAuthenticator.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_location_error_is_transparent() {
        let err: AuthError = LocateError::InvalidAuthHeader.into();
        assert_eq!(err.to_string(), "auth header is invalid");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_failed_authentication_message() {
        let err = AuthError::failed_authentication(anyhow::anyhow!("incorrect username or password"));
        assert_eq!(err.to_string(), "incorrect username or password");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
