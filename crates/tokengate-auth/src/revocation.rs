//! Token revocation.
//!
//! A revoked token is recorded under a key derived from its fingerprint, with a
//! TTL that covers the token's whole remaining life: its expiry plus the
//! refresh window. After that point the token is rejected on temporal grounds
//! anyway, so the record can safely disappear.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokengate_cache::{MemoryCache, TtlCache, keys};
use tokengate_core::{AuthError, Clock};
use tracing::{debug, instrument, warn};

use crate::claims::TokenClaims;

#[derive(Debug, Clone)]
pub struct RevocationStore {
    cache: Arc<dyn TtlCache>,
    prefix: String,
    max_refresh: Duration,
    clock: Arc<dyn Clock>,
}

impl RevocationStore {
    pub fn new(
        cache: Arc<dyn TtlCache>,
        prefix: impl Into<String>,
        max_refresh: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            max_refresh,
            clock,
        }
    }

    /// A store backed by a process-local [`MemoryCache`] on the same clock.
    pub fn in_memory(max_refresh: Duration, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
        Self::new(cache, keys::DEFAULT_PREFIX, max_refresh, clock)
    }

    /// Remaining lifetime of a revocation record for `claims`, or `None` when
    /// `exp + max_refresh` is already in the past.
    ///
    /// Computed in milliseconds and truncated to whole seconds. With a zero
    /// refresh window this means a token inside the last second before its
    /// `exp` still authenticates, while logout and refresh report
    /// [`AuthError::RevocationWindowElapsed`] for it.
    pub fn ttl_for(&self, claims: &TokenClaims) -> Option<StdDuration> {
        let deadline_ms = claims
            .exp
            .saturating_mul(1000)
            .saturating_add(self.max_refresh.num_milliseconds());
        let remaining_ms = deadline_ms.saturating_sub(self.clock.now().timestamp_millis());

        let secs = u64::try_from(remaining_ms / 1000).ok()?;
        (secs > 0).then(|| StdDuration::from_secs(secs))
    }

    /// Marks `token` as revoked until it could no longer be used anyway.
    ///
    /// # Errors
    ///
    /// - [`AuthError::RevocationWindowElapsed`] if the TTL would be non-positive;
    ///   nothing is stored
    /// - [`AuthError::RevocationStore`] if the backend write fails
    #[instrument(skip_all, fields(exp = claims.exp))]
    pub async fn revoke(&self, token: &str, claims: &TokenClaims) -> Result<(), AuthError> {
        let ttl = self
            .ttl_for(claims)
            .ok_or(AuthError::RevocationWindowElapsed)?;

        self.cache
            .set_with_ttl(&keys::revoked(&self.prefix, token), true, ttl)
            .await
            .map_err(AuthError::revocation_store)?;

        debug!(ttl_secs = ttl.as_secs(), "Token revoked");
        Ok(())
    }

    /// Whether `token` has been revoked.
    ///
    /// A backend failure is logged and treated as "not revoked", so an
    /// unreachable cache never locks every client out.
    pub async fn is_revoked(&self, token: &str) -> bool {
        match self.cache.contains(&keys::revoked(&self.prefix, token)).await {
            Ok(revoked) => revoked,
            Err(e) => {
                warn!(error = %e, "Revocation lookup failed; treating token as not revoked");
                false
            }
        }
    }

    pub fn max_refresh(&self) -> Duration {
        self.max_refresh
    }
}
