//! The TTL-set interface shared by every cache backend.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

/// Error type for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] ::redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TTL out of range: {0:?}")]
    InvalidTtl(Duration),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// A set of keys that expire on their own.
///
/// Implementations must be safe for unbounded concurrent use; callers never
/// add locking of their own.
#[async_trait]
pub trait TtlCache: Send + Sync + Debug {
    /// Stores `value` under `key`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: bool, ttl: Duration) -> Result<(), CacheError>;

    /// Whether `key` is present and not yet expired.
    async fn contains(&self, key: &str) -> Result<bool, CacheError>;
}
