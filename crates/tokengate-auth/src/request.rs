//! Transport-neutral snapshot of the parts of a request the engine reads.

use std::collections::HashMap;

/// Headers, query parameters, cookies and generic parameters of one request.
///
/// Header names are case-insensitive. Generic parameters (`param:` rules) are
/// looked up among the explicit params first and fall back to the query string.
#[derive(Debug, Clone, Default)]
pub struct RequestView {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    cookies: HashMap<String, String>,
    params: HashMap<String, String>,
}

impl RequestView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header. The first value for a name wins.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.as_ref().to_ascii_lowercase())
            .or_insert_with(|| value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .or_else(|| self.query.get(name))
            .map(String::as_str)
    }
}
