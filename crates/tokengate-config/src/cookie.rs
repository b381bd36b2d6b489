//! Cookie mirroring of issued tokens.

/// Settings for emitting the token as a cookie on login and refresh.
///
/// The cookie path is always `/` and its max-age is the remaining token lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieConfig {
    /// Whether login and refresh responses set the cookie at all.
    pub send_cookie: bool,
    pub name: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            send_cookie: false,
            name: "jwt".to_string(),
            domain: None,
            secure: false,
            http_only: false,
        }
    }
}
