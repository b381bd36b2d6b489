//! Token lookup rules.
//!
//! A lookup string is a comma-separated list of `source:name` pairs evaluated
//! left to right, e.g. `header:Authorization,query:token,cookie:jwt`. It is
//! parsed once at configuration time; unknown sources are rejected here rather
//! than on the first request.

use std::fmt;
use std::str::FromStr;

use tokengate_core::ConfigError;

pub const DEFAULT_TOKEN_LOOKUP: &str = "header:Authorization";

/// Where in a request a token may be carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupSource {
    Header,
    Query,
    Cookie,
    /// Generic request parameter (path parameters, then query parameters).
    Param,
}

impl LookupSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
            Self::Cookie => "cookie",
            Self::Param => "param",
        }
    }
}

impl FromStr for LookupSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(Self::Header),
            "query" => Ok(Self::Query),
            "cookie" => Ok(Self::Cookie),
            "param" => Ok(Self::Param),
            other => Err(ConfigError::UnknownLookupSource(other.to_string())),
        }
    }
}

impl fmt::Display for LookupSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(source, field-name)` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRule {
    pub source: LookupSource,
    pub name: String,
}

impl LookupRule {
    pub fn new(source: LookupSource, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
        }
    }
}

impl FromStr for LookupRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, name) = s
            .split_once(':')
            .ok_or_else(|| ConfigError::MalformedLookupRule(s.to_string()))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::MalformedLookupRule(s.to_string()));
        }

        Ok(Self::new(source.trim().parse()?, name))
    }
}

impl fmt::Display for LookupRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.name)
    }
}

/// Ordered, validated list of lookup rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLookup {
    rules: Vec<LookupRule>,
}

impl TokenLookup {
    /// Parses a lookup string. An empty string yields the default
    /// `header:Authorization`.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let rules = spec
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(LookupRule::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        if rules.is_empty() {
            return Ok(Self::default());
        }

        Ok(Self { rules })
    }

    pub fn from_rules(rules: Vec<LookupRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[LookupRule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &LookupRule> {
        self.rules.iter()
    }
}

impl Default for TokenLookup {
    fn default() -> Self {
        Self {
            rules: vec![LookupRule::new(LookupSource::Header, "Authorization")],
        }
    }
}

impl FromStr for TokenLookup {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TokenLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .rules
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_order() {
        let lookup = TokenLookup::parse("header:Authorization,query:token,cookie:jwt").unwrap();
        let rules = lookup.rules();

        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0], LookupRule::new(LookupSource::Header, "Authorization"));
        assert_eq!(rules[1], LookupRule::new(LookupSource::Query, "token"));
        assert_eq!(rules[2], LookupRule::new(LookupSource::Cookie, "jwt"));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let lookup = TokenLookup::parse(" header : Authorization , param: token ").unwrap();
        assert_eq!(lookup.rules()[0].name, "Authorization");
        assert_eq!(lookup.rules()[1].source, LookupSource::Param);
    }

    #[test]
    fn test_parse_empty_uses_default() {
        let lookup = TokenLookup::parse("").unwrap();
        assert_eq!(lookup, TokenLookup::default());
        assert_eq!(lookup.to_string(), DEFAULT_TOKEN_LOOKUP);
    }

    #[test]
    fn test_parse_rejects_unknown_source() {
        let err = TokenLookup::parse("header:Authorization,form:token").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLookupSource(s) if s == "form"));
    }

    #[test]
    fn test_parse_rejects_missing_name() {
        assert!(matches!(
            TokenLookup::parse("query:"),
            Err(ConfigError::MalformedLookupRule(_))
        ));
        assert!(matches!(
            TokenLookup::parse("cookie"),
            Err(ConfigError::MalformedLookupRule(_))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        let spec = "header:Authorization,query:token";
        let lookup: TokenLookup = spec.parse().unwrap();
        assert_eq!(lookup.to_string(), spec);
    }
}
