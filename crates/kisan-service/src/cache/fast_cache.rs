//! Fast cache trait and pair encoding.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use kisan_core::{CacheKey, KisanResult};
use std::time::Duration;
use tracing::warn;

/// A payload read back from the fast cache together with its fetch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastEntry {
    /// Serialized payload.
    pub payload: String,
    /// When the payload was fetched from upstream.
    pub fetched_at: DateTime<Utc>,
}

/// Low-latency TTL store for payload/timestamp pairs.
#[async_trait]
pub trait FastCache: Send + Sync {
    /// Returns the pair for `key`, or `None` unless both halves are present.
    async fn get_entry(&self, key: &CacheKey) -> KisanResult<Option<FastEntry>>;

    /// Replaces the pair for `key` as one operation.
    ///
    /// Both halves are deleted, then set with the same `ttl`.
    async fn set_entry(
        &self,
        key: &CacheKey,
        payload: &str,
        fetched_at: DateTime<Utc>,
        ttl: Duration,
    ) -> KisanResult<()>;

    /// Deletes both halves of the pair.
    async fn delete(&self, key: &CacheKey) -> KisanResult<()>;

    /// Returns true if the payload key exists.
    async fn exists(&self, key: &CacheKey) -> KisanResult<bool>;

    /// Returns the stored fetch timestamp.
    async fn cached_at(&self, key: &CacheKey) -> KisanResult<Option<DateTime<Utc>>>;

    /// Returns the time left before the payload key expires.
    async fn remaining_ttl(&self, key: &CacheKey) -> KisanResult<Option<Duration>>;

    /// Returns true when the backend is active.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Encodes a fetch timestamp for the timestamp key.
#[must_use]
pub fn encode_timestamp(fetched_at: DateTime<Utc>) -> String {
    fetched_at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a value written by [`encode_timestamp`].
pub(crate) fn decode_timestamp(key: &CacheKey, raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(e) => {
            warn!(key = %key, value = raw, error = %e, "Unparseable cache timestamp");
            None
        }
    }
}

/// Combines the two halves read from the backend.
///
/// A payload without a parseable timestamp, or a timestamp without a
/// payload, is reported as absent.
#[must_use]
pub fn decode_pair(key: &CacheKey, payload: Option<String>, timestamp: Option<String>) -> Option<FastEntry> {
    match (payload, timestamp) {
        (Some(payload), Some(raw)) => {
            decode_timestamp(key, &raw).map(|fetched_at| FastEntry { payload, fetched_at })
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!(key = %key, "Incomplete cache pair treated as miss");
            None
        }
        (None, None) => None,
    }
}
