//! Ordered multi-source token extraction.

use tokengate_config::{JwtConfig, LookupRule, LookupSource, TokenLookup};
use tokengate_core::LocateError;
use tracing::trace;

use crate::request::RequestView;

/// Extracts the raw token from a request by trying each lookup rule in order.
#[derive(Debug, Clone)]
pub struct TokenLocator {
    lookup: TokenLookup,
    head_name: String,
}

impl TokenLocator {
    pub fn new(lookup: TokenLookup, head_name: impl Into<String>) -> Self {
        Self {
            lookup,
            head_name: head_name.into().trim().to_string(),
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(config.lookup.clone(), config.token_head_name.clone())
    }

    /// Returns the first non-empty token found by the configured rules.
    ///
    /// # Errors
    ///
    /// When no rule yields a token, returns [`LocateError::InvalidAuthHeader`]
    /// if some header rule found a value with the wrong scheme, and
    /// [`LocateError::NoToken`] otherwise.
    pub fn locate(&self, request: &RequestView) -> Result<String, LocateError> {
        let mut malformed_header = false;

        for rule in self.lookup.iter() {
            match self.extract(rule, request) {
                Ok(token) => {
                    trace!(source = %rule.source, name = %rule.name, "Token located");
                    return Ok(token);
                }
                Err(LocateError::InvalidAuthHeader) => malformed_header = true,
                Err(_) => {}
            }
        }

        if malformed_header {
            Err(LocateError::InvalidAuthHeader)
        } else {
            Err(LocateError::NoToken)
        }
    }

    /// Applies a single rule.
    ///
    /// # Errors
    ///
    /// Returns the source-specific "empty" kind when the field is absent or
    /// blank, and [`LocateError::InvalidAuthHeader`] when a header does not
    /// have the form `<head> <token>`.
    pub fn extract(&self, rule: &LookupRule, request: &RequestView) -> Result<String, LocateError> {
        match rule.source {
            LookupSource::Header => self.from_header(request.header(&rule.name)),
            LookupSource::Query => non_empty(request.query(&rule.name), LocateError::EmptyQueryToken),
            LookupSource::Cookie => {
                non_empty(request.cookie(&rule.name), LocateError::EmptyCookieToken)
            }
            LookupSource::Param => non_empty(request.param(&rule.name), LocateError::EmptyParamToken),
        }
    }

    fn from_header(&self, value: Option<&str>) -> Result<String, LocateError> {
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => return Err(LocateError::EmptyAuthHeader),
        };

        if self.head_name.is_empty() {
            return Ok(value.to_string());
        }

        match value.split_once(' ') {
            Some((head, token)) if head == self.head_name && !token.is_empty() => {
                Ok(token.to_string())
            }
            _ => Err(LocateError::InvalidAuthHeader),
        }
    }
}

fn non_empty(value: Option<&str>, empty: LocateError) -> Result<String, LocateError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(empty),
    }
}
