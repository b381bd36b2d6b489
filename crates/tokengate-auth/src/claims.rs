//! Typed claim set.
//!
//! Reserved claims (`exp`, `iat`, `jti` and the configured identity claim) are
//! held in dedicated fields; every other caller-defined field lives in an open
//! extension map. A [`TokenClaims`] value always carries a numeric expiry.
//!
//! The identity claim name is configurable, so conversion to and from the wire
//! map takes the identity key explicitly.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Map, Value};
use tokengate_core::AuthError;
use uuid::Uuid;

pub const EXPIRES_AT: &str = "exp";
pub const ISSUED_AT: &str = "iat";
/// Unique token identifier, so two tokens issued within the same second differ.
pub const TOKEN_ID: &str = "jti";

#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    /// Expiration timestamp (Unix seconds).
    pub exp: i64,
    /// Issued-at timestamp (Unix seconds). Always set on tokens issued here.
    pub iat: Option<i64>,
    pub jti: Option<String>,
    pub identity: Option<Value>,
    /// Caller-defined claims.
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Builds the claim set for a new token from a payload-builder result.
    ///
    /// Reserved temporal claims in `payload` are overwritten by `iat = now`
    /// and `exp = now + lifetime`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingIdentity`] when `payload` has no `identity_key` entry
    /// - [`AuthError::FailedTokenCreation`] when `now + lifetime` overflows
    pub fn issue(
        mut payload: Map<String, Value>,
        identity_key: &str,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<Self, AuthError> {
        let identity = payload
            .remove(identity_key)
            .ok_or(AuthError::MissingIdentity)?;

        for reserved in [EXPIRES_AT, ISSUED_AT, TOKEN_ID] {
            payload.remove(reserved);
        }

        Ok(Self {
            exp: expiry(now, lifetime)?,
            iat: Some(now.timestamp()),
            jti: Some(Uuid::new_v4().to_string()),
            identity: Some(identity),
            extra: payload,
        })
    }

    /// Parses a verified wire map.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingExpField`] if `exp` is absent
    /// - [`AuthError::WrongFormatOfExp`] if `exp` is not a number
    pub fn from_map(mut map: Map<String, Value>, identity_key: &str) -> Result<Self, AuthError> {
        let exp = match map.remove(EXPIRES_AT) {
            None | Some(Value::Null) => return Err(AuthError::MissingExpField),
            Some(value) => numeric(&value).ok_or(AuthError::WrongFormatOfExp)?,
        };
        let iat = map.remove(ISSUED_AT).as_ref().and_then(numeric);
        let jti = match map.remove(TOKEN_ID) {
            Some(Value::String(id)) => Some(id),
            _ => None,
        };
        let identity = map.remove(identity_key);

        Ok(Self {
            exp,
            iat,
            jti,
            identity,
            extra: map,
        })
    }

    /// Serialises back to the wire map signed into a token.
    pub fn to_map(&self, identity_key: &str) -> Map<String, Value> {
        let mut map = self.extra.clone();
        if let Some(identity) = &self.identity {
            map.insert(identity_key.to_string(), identity.clone());
        }
        if let Some(jti) = &self.jti {
            map.insert(TOKEN_ID.to_string(), Value::String(jti.clone()));
        }
        if let Some(iat) = self.iat {
            map.insert(ISSUED_AT.to_string(), Value::from(iat));
        }
        map.insert(EXPIRES_AT.to_string(), Value::from(self.exp));
        map
    }

    /// Copy of these claims re-stamped for a new token.
    ///
    /// # Errors
    ///
    /// [`AuthError::FailedTokenCreation`] when `now + lifetime` overflows.
    pub fn restamp(&self, now: DateTime<Utc>, lifetime: Duration) -> Result<Self, AuthError> {
        Ok(Self {
            exp: expiry(now, lifetime)?,
            iat: Some(now.timestamp()),
            jti: Some(Uuid::new_v4().to_string()),
            ..self.clone()
        })
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// `true` once `now` has reached `exp`; a token is valid only strictly before it.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }

    /// Looks up a caller-defined claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

fn expiry(now: DateTime<Utc>, lifetime: Duration) -> Result<i64, AuthError> {
    now.checked_add_signed(lifetime)
        .map(|exp| exp.timestamp())
        .ok_or(AuthError::FailedTokenCreation)
}

fn numeric(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}
