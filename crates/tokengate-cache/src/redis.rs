//! Redis cache client for revocation records shared across processes.

use std::time::Duration;

use ::redis::{AsyncCommands, Client, aio::ConnectionManager};
use async_trait::async_trait;
use tracing::{debug, error, instrument};

use crate::store::{CacheError, TtlCache};

/// Redis-backed TTL cache with a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Creates a new Redis cache client.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if connection fails.
    pub async fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl TtlCache for RedisCache {
    #[instrument(skip(self), fields(cache.operation = "SETEX"))]
    async fn set_with_ttl(&self, key: &str, value: bool, ttl: Duration) -> Result<(), CacheError> {
        // SET EX rejects a zero expiry.
        if ttl.as_secs() == 0 {
            return Err(CacheError::InvalidTtl(ttl));
        }

        let mut conn = self.conn.clone();
        let json = serde_json::to_string(&value)?;

        conn.set_ex::<_, _, ()>(key, json, ttl.as_secs()).await?;

        debug!(cache.key = %key, cache.ttl_secs = %ttl.as_secs(), "Cache set");

        Ok(())
    }

    #[instrument(skip(self), fields(cache.operation = "EXISTS"))]
    async fn contains(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();

        let exists = conn.exists::<_, bool>(key).await.map_err(|e| {
            error!(cache.key = %key, error = %e, "Redis EXISTS error");
            CacheError::from(e)
        })?;

        debug!(cache.key = %key, cache.hit = %exists, "Cache lookup");

        Ok(exists)
    }
}
