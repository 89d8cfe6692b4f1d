//! Write path: replaces both tiers after a successful fetch.

use crate::cache::FastCache;
use crate::metrics::CacheMetrics;
use chrono::{DateTime, Utc};
use kisan_core::{CacheKey, CacheTier, DataKind, KisanResult, LocationKey};
use kisan_repository::DurableCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long [`Invalidator::write`] waits on the durable upsert before
/// returning and leaving it to finish in the background.
pub const DEFAULT_DURABLE_WAIT: Duration = Duration::from_millis(250);

/// Writes fetched payloads to the fast and durable tiers and handles
/// explicit invalidation.
#[derive(Clone)]
pub struct Invalidator {
    fast: Arc<dyn FastCache>,
    durable: Arc<dyn DurableCache>,
    ttl: Duration,
    durable_wait: Duration,
}

impl Invalidator {
    /// Creates an invalidator writing fast entries with `ttl`.
    pub fn new(fast: Arc<dyn FastCache>, durable: Arc<dyn DurableCache>, ttl: Duration) -> Self {
        Self {
            fast,
            durable,
            ttl,
            durable_wait: DEFAULT_DURABLE_WAIT,
        }
    }

    /// Sets how long a write waits on the durable upsert.
    #[must_use]
    pub const fn with_durable_wait(mut self, durable_wait: Duration) -> Self {
        self.durable_wait = durable_wait;
        self
    }

    /// Returns the fast cache TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Replaces the fast pair and upserts the durable row.
    ///
    /// Both writes are best-effort. Failures are logged and counted, and
    /// never surface to the reader that triggered the fetch. The fast pair
    /// is written before returning. The durable upsert runs as its own task
    /// and is awaited for at most the configured durable wait, so a slow
    /// database never holds the response back for longer than that.
    pub async fn write(&self, key: &CacheKey, payload: &str, fetched_at: DateTime<Utc>) {
        if let Err(e) = self.fast.set_entry(key, payload, fetched_at, self.ttl).await {
            warn!(key = %key, error = %e, "Fast cache write failed");
            CacheMetrics::write_failure(key.kind(), CacheTier::Fast);
        }

        let durable = Arc::clone(&self.durable);
        let owned_key = key.clone();
        let owned_payload = payload.to_owned();
        let upsert = tokio::spawn(async move {
            if let Err(e) = durable.upsert(&owned_key, &owned_payload, fetched_at).await {
                warn!(key = %owned_key, error = %e, "Durable cache write failed");
                CacheMetrics::write_failure(owned_key.kind(), CacheTier::Durable);
            }
        });

        match tokio::time::timeout(self.durable_wait, upsert).await {
            Ok(Ok(())) => {
                debug!(key = %key, fetched_at = %fetched_at, "Cache tiers updated");
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Durable cache write task failed");
                CacheMetrics::write_failure(key.kind(), CacheTier::Durable);
            }
            Err(_) => {
                debug!(
                    key = %key,
                    wait_ms = self.durable_wait.as_millis() as u64,
                    "Durable cache write still pending, continuing in background"
                );
            }
        }
    }

    /// Removes the fast pair for `key`. The durable row is kept.
    pub async fn invalidate(&self, key: &CacheKey) -> KisanResult<()> {
        self.fast.delete(key).await?;
        info!(key = %key, "Fast cache entry invalidated");
        Ok(())
    }

    /// Removes the fast pair of every kind for one location.
    pub async fn invalidate_location(&self, location: &LocationKey) -> KisanResult<()> {
        for kind in DataKind::ALL {
            self.fast
                .delete(&CacheKey::new(kind, location.clone()))
                .await?;
        }
        info!(location = %location, "Fast cache entries invalidated for location");
        Ok(())
    }
}

impl std::fmt::Debug for Invalidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invalidator")
            .field("ttl", &self.ttl)
            .field("durable_wait", &self.durable_wait)
            .finish_non_exhaustive()
    }
}
