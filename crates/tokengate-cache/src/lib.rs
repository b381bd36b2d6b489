//! # Tokengate Cache
//!
//! TTL-keyed set backends for the revocation store.
//!
//! This crate provides:
//! - The [`TtlCache`] trait (`set_with_ttl` / `contains`), the only interface
//!   through which revocation records are written or read
//! - [`MemoryCache`]: an in-process sharded map with per-entry deadlines
//! - [`RedisCache`]: a shared Redis backend using `SET EX` / `EXISTS`
//! - Cache configuration from environment variables
//! - Key derivation ([`keys`]) so raw tokens are never used as keys
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokengate_cache::{CacheConfig, open_cache};
//! use tokengate_core::SystemClock;
//!
//! let config = CacheConfig::from_env()?;
//! let cache = open_cache(&config, Arc::new(SystemClock)).await?;
//!
//! cache.set_with_ttl("key", true, Duration::from_secs(60)).await?;
//! assert!(cache.contains("key").await?);
//! ```

pub mod config;
pub mod keys;
pub mod memory;
pub mod redis;
pub mod store;

use std::sync::Arc;

use tokengate_core::Clock;

pub use config::{CacheBackend, CacheConfig};
pub use memory::MemoryCache;
pub use crate::redis::RedisCache;
pub use store::{CacheError, TtlCache};

/// Opens the backend selected by `config`.
///
/// The clock is only used by the in-memory backend; Redis expires keys on
/// its own clock.
///
/// # Errors
///
/// Returns `CacheError::Connection` if the Redis backend cannot connect.
pub async fn open_cache(
    config: &CacheConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn TtlCache>, CacheError> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::with_clock(clock))),
        CacheBackend::Redis => Ok(Arc::new(RedisCache::new(&config.redis_url).await?)),
    }
}
