//! Revocation cache configuration.
//!
//! This module provides configuration for the cache backend loaded from
//! environment variables.

use std::env;

use tokengate_core::ConfigError;

use crate::keys::DEFAULT_PREFIX;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Which [`crate::TtlCache`] implementation backs the revocation store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

/// Cache configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `REDIS_URL`: Redis connection URL; setting it selects the Redis backend
/// - `CACHE_BACKEND`: `memory` or `redis`, overriding the choice made from
///   `REDIS_URL` (default: `redis` when `REDIS_URL` is set, else `memory`)
/// - `CACHE_PREFIX`: Prefix for all cache keys (default: `tokengate`)
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Redis connection URL.
    pub redis_url: String,

    /// Prefix for all cache keys to avoid collisions.
    pub key_prefix: String,
}

impl CacheConfig {
    /// Load configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// See [`CacheConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a `CACHE_BACKEND` other than
    /// `memory` or `redis`.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let redis_url = var("REDIS_URL").filter(|url| !url.trim().is_empty());

        let backend = match var("CACHE_BACKEND") {
            Some(value) if !value.trim().is_empty() => {
                match value.trim().to_ascii_lowercase().as_str() {
                    "memory" => CacheBackend::Memory,
                    "redis" => CacheBackend::Redis,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: "CACHE_BACKEND".to_string(),
                            value,
                        });
                    }
                }
            }
            _ if redis_url.is_some() => CacheBackend::Redis,
            _ => CacheBackend::Memory,
        };

        Ok(Self {
            backend,
            redis_url: redis_url.unwrap_or_else(|| DEFAULT_REDIS_URL.into()),
            key_prefix: var("CACHE_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.into()),
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: DEFAULT_REDIS_URL.into(),
            key_prefix: DEFAULT_PREFIX.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_is_memory() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, CacheBackend::Memory);
        assert_eq!(config.key_prefix, "tokengate");
    }

    #[test]
    fn test_no_variables_is_memory() {
        let config = CacheConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config.backend, CacheBackend::Memory);
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
    }

    #[test]
    fn test_redis_url_selects_redis() {
        let config =
            CacheConfig::from_vars(vars(&[("REDIS_URL", "redis://cache:6379")])).unwrap();
        assert_eq!(config.backend, CacheBackend::Redis);
        assert_eq!(config.redis_url, "redis://cache:6379");
    }

    #[test]
    fn test_backend_overrides_redis_url() {
        let config = CacheConfig::from_vars(vars(&[
            ("REDIS_URL", "redis://cache:6379"),
            ("CACHE_BACKEND", "Memory"),
        ]))
        .unwrap();
        assert_eq!(config.backend, CacheBackend::Memory);

        let config = CacheConfig::from_vars(vars(&[("CACHE_BACKEND", "redis")])).unwrap();
        assert_eq!(config.backend, CacheBackend::Redis);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = CacheConfig::from_vars(vars(&[
            ("REDIS_URL", "redis://cache:6379"),
            ("CACHE_BACKEND", "Redis-cluster"),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { key, value } if key == "CACHE_BACKEND" && value == "Redis-cluster")
        );
    }

    #[test]
    fn test_prefix_override() {
        let config = CacheConfig::from_vars(vars(&[("CACHE_PREFIX", "svc")])).unwrap();
        assert_eq!(config.key_prefix, "svc");
    }
}
