//! Read-path response contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Which tier produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    /// Served from the TTL-bounded fast cache.
    Fast,
    /// Freshly fetched from the upstream source.
    Upstream,
    /// Served from the durable fallback store.
    Durable,
}

impl CacheTier {
    /// Returns the tier name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Upstream => "upstream",
            Self::Durable => "durable",
        }
    }
}

impl Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload returned by the cache together with its provenance.
///
/// `served_from_fallback` is true exactly when `tier` is [`CacheTier::Durable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResponse<T> {
    /// The upstream payload.
    pub payload: T,
    /// When the payload was originally fetched from upstream.
    pub fetched_at: DateTime<Utc>,
    /// Whether the durable fallback store answered.
    pub served_from_fallback: bool,
    /// The tier that answered.
    pub tier: CacheTier,
}

impl<T> CachedResponse<T> {
    /// Creates a response, deriving the fallback flag from the tier.
    #[must_use]
    pub fn new(payload: T, fetched_at: DateTime<Utc>, tier: CacheTier) -> Self {
        Self {
            payload,
            fetched_at,
            served_from_fallback: tier == CacheTier::Durable,
            tier,
        }
    }

    /// Returns how old the payload is relative to `now`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.fetched_at
    }

    /// Maps the payload, keeping provenance.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> CachedResponse<U> {
        CachedResponse {
            payload: f(self.payload),
            fetched_at: self.fetched_at,
            served_from_fallback: self.served_from_fallback,
            tier: self.tier,
        }
    }
}
