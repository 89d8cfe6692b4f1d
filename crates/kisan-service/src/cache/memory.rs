//! In-process fast cache, used when Redis is disabled and in tests.

use super::fast_cache::{FastCache, FastEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kisan_core::{CacheKey, KisanResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredPair {
    entry: FastEntry,
    expires_at: Instant,
}

/// Fast cache backed by a `HashMap` with lazy expiry on the tokio clock.
///
/// Both halves of a pair live in one map slot, so they always expire together.
#[derive(Debug, Default)]
pub struct InMemoryFastCache {
    pairs: Mutex<HashMap<CacheKey, StoredPair>>,
}

impl InMemoryFastCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live pair for `key`, dropping it if expired.
    fn live(&self, key: &CacheKey) -> Option<StoredPair> {
        let mut pairs = self.pairs.lock();
        match pairs.get(key) {
            Some(pair) if pair.expires_at > Instant::now() => Some(pair.clone()),
            Some(_) => {
                pairs.remove(key);
                debug!("Expired key '{}'", key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl FastCache for InMemoryFastCache {
    async fn get_entry(&self, key: &CacheKey) -> KisanResult<Option<FastEntry>> {
        let entry = self.live(key).map(|pair| pair.entry);
        match &entry {
            Some(_) => debug!("Cache hit for key '{}'", key),
            None => debug!("Cache miss for key '{}'", key),
        }
        Ok(entry)
    }

    async fn set_entry(
        &self,
        key: &CacheKey,
        payload: &str,
        fetched_at: DateTime<Utc>,
        ttl: Duration,
    ) -> KisanResult<()> {
        let pair = StoredPair {
            entry: FastEntry {
                payload: payload.to_string(),
                fetched_at,
            },
            expires_at: Instant::now() + ttl,
        };
        self.pairs.lock().insert(key.clone(), pair);
        debug!("Cached key '{}' with TTL {}s", key, ttl.as_secs());
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> KisanResult<()> {
        let deleted = self.pairs.lock().remove(key).is_some();
        debug!("Deleted key '{}': {}", key, deleted);
        Ok(())
    }

    async fn exists(&self, key: &CacheKey) -> KisanResult<bool> {
        Ok(self.live(key).is_some())
    }

    async fn cached_at(&self, key: &CacheKey) -> KisanResult<Option<DateTime<Utc>>> {
        Ok(self.live(key).map(|pair| pair.entry.fetched_at))
    }

    async fn remaining_ttl(&self, key: &CacheKey) -> KisanResult<Option<Duration>> {
        Ok(self
            .live(key)
            .map(|pair| pair.expires_at.saturating_duration_since(Instant::now())))
    }
}
