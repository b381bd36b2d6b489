//! Host-supplied collaborators.
//!
//! Each trait has a default implementation that the pipeline uses when the
//! host does not provide one, except [`Authenticator`]: login is impossible
//! without it.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokengate_core::AuthError;

use crate::claims::TokenClaims;
use crate::request::RequestView;

/// Validates login credentials and returns the identity they belong to.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AuthError::FailedAuthentication`] (or
    /// [`AuthError::MissingLoginValues`]) when the credentials are rejected.
    async fn authenticate(&self, request: &RequestView, body: &Value) -> Result<Value, AuthError>;
}

/// Decides whether an authenticated identity may access the request.
pub trait Authorizator: Send + Sync {
    fn authorize(&self, identity: Option<&Value>, request: &RequestView) -> bool;
}

impl<F> Authorizator for F
where
    F: Fn(Option<&Value>, &RequestView) -> bool + Send + Sync,
{
    fn authorize(&self, identity: Option<&Value>, request: &RequestView) -> bool {
        self(identity, request)
    }
}

/// Authorizes every identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizator for AllowAll {
    fn authorize(&self, _identity: Option<&Value>, _request: &RequestView) -> bool {
        true
    }
}

/// Derives the identity attached to an authenticated request.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, claims: &TokenClaims, request: &RequestView) -> Option<Value>;
}

/// Uses the identity claim as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimIdentity;

impl IdentityResolver for ClaimIdentity {
    fn resolve(&self, claims: &TokenClaims, _request: &RequestView) -> Option<Value> {
        claims.identity.clone()
    }
}

/// Turns identity data into the caller-defined claims of a new token.
pub trait PayloadBuilder: Send + Sync {
    fn build(&self, data: &Value, identity_key: &str) -> Map<String, Value>;
}

impl<F> PayloadBuilder for F
where
    F: Fn(&Value, &str) -> Map<String, Value> + Send + Sync,
{
    fn build(&self, data: &Value, identity_key: &str) -> Map<String, Value> {
        self(data, identity_key)
    }
}

/// Copies the fields of an object into the claims; any other value is
/// stored under the identity key.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPayload;

impl PayloadBuilder for DefaultPayload {
    fn build(&self, data: &Value, identity_key: &str) -> Map<String, Value> {
        match data {
            Value::Object(fields) => fields.clone(),
            other => {
                let mut map = Map::new();
                map.insert(identity_key.to_string(), other.clone());
                map
            }
        }
    }
}

/// Renders the message reported alongside a rejection.
pub trait MessageFormatter: Send + Sync {
    fn format(&self, error: &AuthError, request: &RequestView) -> String;
}

/// The error's `Display` text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayMessage;

impl MessageFormatter for DisplayMessage {
    fn format(&self, error: &AuthError, _request: &RequestView) -> String {
        error.to_string()
    }
}

/// Username/password pair for authenticators that read a conventional login body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl LoginCredentials {
    /// # Errors
    ///
    /// Returns [`AuthError::MissingLoginValues`] if either field is absent or empty.
    pub fn from_body(body: &Value) -> Result<Self, AuthError> {
        let credentials = Self::deserialize(body).map_err(|_| AuthError::MissingLoginValues)?;
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(AuthError::MissingLoginValues);
        }
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_payload_flattens_objects() {
        let map = DefaultPayload.build(&json!({"identity": "u1", "role": "admin"}), "identity");
        assert_eq!(map["identity"], json!("u1"));
        assert_eq!(map["role"], json!("admin"));
    }

    #[test]
    fn test_default_payload_wraps_scalars() {
        let map = DefaultPayload.build(&json!(42), "uid");
        assert_eq!(map.len(), 1);
        assert_eq!(map["uid"], json!(42));
    }

    #[test]
    fn test_closure_authorizator() {
        let admins_only = |identity: Option<&Value>, _: &RequestView| {
            identity.is_some_and(|id| id == "admin")
        };
        let request = RequestView::new();

        assert!(admins_only.authorize(Some(&json!("admin")), &request));
        assert!(!admins_only.authorize(Some(&json!("guest")), &request));
        assert!(!admins_only.authorize(None, &request));
        assert!(AllowAll.authorize(None, &request));
    }

    #[test]
    fn test_login_credentials() {
        let creds = LoginCredentials::from_body(&json!({"username": "admin", "password": "admin"}))
            .unwrap();
        assert_eq!(creds.username, "admin");

        for body in [json!({}), json!({"username": "admin"}), json!({"username": "", "password": "x"})] {
            assert!(matches!(
                LoginCredentials::from_body(&body),
                Err(AuthError::MissingLoginValues)
            ));
        }
    }

    #[test]
    fn test_display_message() {
        let message = DisplayMessage.format(&AuthError::ExpiredToken, &RequestView::new());
        assert_eq!(message, "token is expired");
    }
}
