//! In-process TTL cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokengate_core::{Clock, SystemClock};
use tracing::{debug, instrument};

use crate::store::{CacheError, TtlCache};

/// Minimum time between two sweeps triggered by writes.
pub const SWEEP_INTERVAL_SECS: i64 = 60;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: bool,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Sharded in-memory TTL cache.
///
/// Expired entries are dropped when looked up, and a write sweeps the whole
/// map once at least [`SWEEP_INTERVAL_SECS`] have passed since the last sweep,
/// so records that are never read again are still reclaimed.
/// Records are lost on restart; use [`crate::RedisCache`] to share revocations
/// across processes.
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
    /// Unix seconds at which the next write-triggered sweep is due.
    next_sweep: AtomicI64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let next_sweep = clock.now().timestamp().saturating_add(SWEEP_INTERVAL_SECS);
        Self {
            entries: DashMap::new(),
            clock,
            next_sweep: AtomicI64::new(next_sweep),
        }
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    fn sweep_if_due(&self, now: DateTime<Utc>) {
        let due = self.next_sweep.load(Ordering::Acquire);
        if now.timestamp() < due {
            return;
        }

        let next = now.timestamp().saturating_add(SWEEP_INTERVAL_SECS);
        // Only the writer that moves the deadline runs the sweep.
        if self
            .next_sweep
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let dropped = self.purge_expired();
            debug!(cache.dropped = dropped, "Expired entries swept");
        }
    }

    /// Number of stored entries, including ones that expired but were not purged yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtlCache for MemoryCache {
    #[instrument(skip(self), fields(cache.operation = "SETEX"))]
    async fn set_with_ttl(&self, key: &str, value: bool, ttl: Duration) -> Result<(), CacheError> {
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or(CacheError::InvalidTtl(ttl))?;

        self.sweep_if_due(now);

        self.entries
            .insert(key.to_string(), Entry { value, expires_at });

        debug!(cache.key = %key, cache.ttl_secs = %ttl.as_secs(), "Cache set");

        Ok(())
    }

    #[instrument(skip(self), fields(cache.operation = "EXISTS"))]
    async fn contains(&self, key: &str) -> Result<bool, CacheError> {
        let now = self.clock.now();

        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            debug!(cache.key = %key, "Cache entry expired");
            return Ok(false);
        }

        Ok(self.entries.get(key).is_some_and(|entry| entry.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokengate_core::ManualClock;

    fn cache_with_clock() -> (MemoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (MemoryCache::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_set_and_contains() {
        let (cache, _) = cache_with_clock();

        assert!(!cache.contains("k").await.unwrap());
        cache
            .set_with_ttl("k", true, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.contains("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let (cache, clock) = cache_with_clock();

        cache
            .set_with_ttl("k", true, Duration::from_secs(30))
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(29));
        assert!(cache.contains("k").await.unwrap());

        clock.advance(chrono::Duration::seconds(1));
        assert!(!cache.contains("k").await.unwrap());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (cache, clock) = cache_with_clock();

        cache
            .set_with_ttl("short", true, Duration::from_secs(5))
            .await
            .unwrap();
        cache
            .set_with_ttl("long", true, Duration::from_secs(500))
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(10));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("long").await.unwrap());
    }

    #[tokio::test]
    async fn test_writes_sweep_entries_that_are_never_read() {
        let (cache, clock) = cache_with_clock();

        for key in ["a", "b", "c"] {
            cache
                .set_with_ttl(key, true, Duration::from_secs(5))
                .await
                .unwrap();
        }

        clock.advance(chrono::Duration::seconds(10));
        cache
            .set_with_ttl("d", true, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(cache.len(), 4);

        clock.advance(chrono::Duration::seconds(SWEEP_INTERVAL_SECS));
        cache
            .set_with_ttl("e", true, Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("e").await.unwrap());
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_is_rejected() {
        let (cache, _) = cache_with_clock();

        let err = cache
            .set_with_ttl("k", true, Duration::from_secs(u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidTtl(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writers_and_readers() {
        let cache = Arc::new(MemoryCache::new());

        let mut handles = Vec::new();
        for i in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("key-{}", i);
                cache
                    .set_with_ttl(&key, true, Duration::from_secs(60))
                    .await
                    .unwrap();
                cache.contains(&key).await.unwrap()
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(cache.len(), 32);
    }
}
