//! Durable cache trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kisan_core::{CacheKey, KisanResult};

/// The last successful fetch stored for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurableRecord {
    /// Serialized payload.
    pub payload: String,
    /// When the payload was fetched from upstream.
    pub fetched_at: DateTime<Utc>,
}

/// Persistent store holding the newest successful fetch per key.
///
/// Entries never expire on their own.
#[async_trait]
pub trait DurableCache: Send + Sync {
    /// Returns the stored record, if any.
    async fn get(&self, key: &CacheKey) -> KisanResult<Option<DurableRecord>>;

    /// Inserts or replaces the record for `key`.
    ///
    /// A record with an older `fetched_at` never replaces a newer one.
    async fn upsert(&self, key: &CacheKey, payload: &str, fetched_at: DateTime<Utc>) -> KisanResult<()>;

    /// Deletes every record fetched before `cutoff`, returning how many were removed.
    async fn purge_fetched_before(&self, cutoff: DateTime<Utc>) -> KisanResult<u64>;
}
