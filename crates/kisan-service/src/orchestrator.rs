//! Read path: fast cache, then upstream with retry, then durable fallback.

use crate::cache::FastCache;
use crate::invalidator::Invalidator;
use crate::metrics::CacheMetrics;
use crate::singleflight::InFlight;
use crate::upstream::UpstreamClient;
use chrono::{DateTime, Utc};
use kisan_config::CachePolicy;
use kisan_core::{
    CacheKey, CacheTier, CachedResponse, Clock, DataKind, KisanError, KisanResult, LocationKey,
    NoFallbackAvailable, SystemClock,
};
use kisan_repository::DurableCache;
use kisan_resilience::{with_timeout, RetryPolicy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

type Resolution<T> = Result<CachedResponse<T>, NoFallbackAvailable>;

/// Builds the retry schedule described by a cache policy.
#[must_use]
pub fn retry_policy(policy: &CachePolicy) -> RetryPolicy {
    RetryPolicy {
        max_retries: policy.max_retries,
        initial_delay: policy.backoff_base,
        max_delay: policy.backoff_max,
        multiplier: policy.backoff_factor,
        jitter: policy.jitter,
    }
}

/// Cache orchestrator for one data kind with payload type `T`.
///
/// Cloning is cheap; clones share tiers, policy and the in-flight registry.
pub struct CacheOrchestrator<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    kind: DataKind,
    upstream: Arc<dyn UpstreamClient<T>>,
    fast: Arc<dyn FastCache>,
    durable: Arc<dyn DurableCache>,
    invalidator: Invalidator,
    policy: CachePolicy,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    in_flight: InFlight<CacheKey, Resolution<T>>,
}

impl<T> CacheOrchestrator<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates an orchestrator stamping fetches with the system clock.
    pub fn new(
        kind: DataKind,
        upstream: Arc<dyn UpstreamClient<T>>,
        fast: Arc<dyn FastCache>,
        durable: Arc<dyn DurableCache>,
        policy: CachePolicy,
    ) -> Self {
        Self::with_clock(kind, upstream, fast, durable, policy, Arc::new(SystemClock))
    }

    /// Creates an orchestrator with an explicit clock.
    pub fn with_clock(
        kind: DataKind,
        upstream: Arc<dyn UpstreamClient<T>>,
        fast: Arc<dyn FastCache>,
        durable: Arc<dyn DurableCache>,
        policy: CachePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let invalidator = Invalidator::new(Arc::clone(&fast), Arc::clone(&durable), policy.ttl)
            .with_durable_wait(policy.durable_write_wait);
        let retry = retry_policy(&policy);
        Self {
            inner: Arc::new(Inner {
                kind,
                upstream,
                fast,
                durable,
                invalidator,
                policy,
                retry,
                clock,
                in_flight: InFlight::new(),
            }),
        }
    }

    /// Returns the data kind served.
    #[must_use]
    pub fn kind(&self) -> DataKind {
        self.inner.kind
    }

    /// Returns the effective policy.
    #[must_use]
    pub fn policy(&self) -> &CachePolicy {
        &self.inner.policy
    }

    /// Returns the write-side invalidator sharing this orchestrator's tiers.
    #[must_use]
    pub fn invalidator(&self) -> &Invalidator {
        &self.inner.invalidator
    }

    /// Reads data for a raw district/state pair.
    ///
    /// Fails with [`KisanError::Validation`] on an empty location and with
    /// [`KisanError::NoFallbackAvailable`] when no tier can answer.
    pub async fn get(&self, district: &str, state: &str) -> KisanResult<CachedResponse<T>> {
        let location = LocationKey::new(district, state)?;
        self.get_location(&location).await
    }

    /// Reads data for a normalized location.
    pub async fn get_location(&self, location: &LocationKey) -> KisanResult<CachedResponse<T>> {
        let kind = self.inner.kind;
        let key = CacheKey::new(kind, location.clone());

        if let Some(hit) = self.inner.read_fast(&key).await {
            return Ok(hit);
        }
        CacheMetrics::fast_miss(kind);

        let resolution = if self.inner.policy.single_flight {
            let inner = Arc::clone(&self.inner);
            let task_key = key.clone();
            let (result, joined) = self
                .inner
                .in_flight
                .run(key, move || async move { inner.resolve(task_key).await })
                .await;
            if joined {
                CacheMetrics::coalesced(kind);
            }
            result.map_err(|e| KisanError::internal(e.to_string()))?
        } else {
            self.inner.resolve(key).await
        };

        resolution.map_err(KisanError::from)
    }

    /// Returns true when the fast cache holds an entry. Never fetches.
    pub async fn is_valid(&self, district: &str, state: &str) -> KisanResult<bool> {
        let key = self.key(district, state)?;
        self.inner.fast.exists(&key).await
    }

    /// Returns the fetch time recorded in the fast cache.
    pub async fn cached_at(&self, district: &str, state: &str) -> KisanResult<Option<DateTime<Utc>>> {
        let key = self.key(district, state)?;
        self.inner.fast.cached_at(&key).await
    }

    /// Returns how long the fast cache entry has left.
    pub async fn remaining_ttl(&self, district: &str, state: &str) -> KisanResult<Option<Duration>> {
        let key = self.key(district, state)?;
        self.inner.fast.remaining_ttl(&key).await
    }

    /// Drops the fast cache entry so the next read goes upstream.
    pub async fn invalidate(&self, district: &str, state: &str) -> KisanResult<()> {
        let key = self.key(district, state)?;
        self.inner.invalidator.invalidate(&key).await
    }

    fn key(&self, district: &str, state: &str) -> KisanResult<CacheKey> {
        CacheKey::from_parts(self.inner.kind, district, state)
    }
}

impl<T> Inner<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn read_fast(&self, key: &CacheKey) -> Option<CachedResponse<T>> {
        let entry = match self.fast.get_entry(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(key = %key, "Fast cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Fast cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<T>(&entry.payload) {
            Ok(payload) => {
                debug!(key = %key, fetched_at = %entry.fetched_at, "Fast cache hit");
                CacheMetrics::fast_hit(self.kind);
                Some(CachedResponse::new(payload, entry.fetched_at, CacheTier::Fast))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Undecodable fast cache payload, treating as miss");
                None
            }
        }
    }

    async fn read_durable(&self, key: &CacheKey) -> Option<CachedResponse<T>> {
        let record = match self.durable.get(key).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Durable cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<T>(&record.payload) {
            Ok(payload) => Some(CachedResponse::new(payload, record.fetched_at, CacheTier::Durable)),
            Err(e) => {
                warn!(key = %key, error = %e, "Undecodable durable payload, treating as miss");
                None
            }
        }
    }

    /// Fetches upstream and writes both tiers, or falls back to the durable tier.
    async fn resolve(&self, key: CacheKey) -> Resolution<T> {
        let kind = self.kind;
        let started = Instant::now();

        let outcome = self
            .retry
            .execute(|| {
                CacheMetrics::upstream_attempt(kind);
                with_timeout(self.policy.attempt_timeout, || {
                    self.upstream.fetch(kind, key.location())
                })
            })
            .await;

        let error = match outcome {
            Ok(payload) => {
                let fetched_at = self.clock.now();
                CacheMetrics::upstream_fetch(kind, started.elapsed(), true);

                match serde_json::to_string(&payload) {
                    Ok(serialized) => self.invalidator.write(&key, &serialized, fetched_at).await,
                    Err(e) => warn!(key = %key, error = %e, "Payload not serializable, cache tiers not updated"),
                }

                info!(key = %key, fetched_at = %fetched_at, "Served from upstream");
                return Ok(CachedResponse::new(payload, fetched_at, CacheTier::Upstream));
            }
            Err(error) => error,
        };

        CacheMetrics::upstream_fetch(kind, started.elapsed(), false);
        let attempts = error.attempts();
        let last_error = error.into_last_error();
        warn!(
            key = %key,
            attempts,
            class = %last_error.class(),
            error = %last_error,
            "Upstream failed, trying durable cache"
        );

        if let Some(fallback) = self.read_durable(&key).await {
            CacheMetrics::durable_fallback(kind);
            warn!(key = %key, fetched_at = %fallback.fetched_at, "Served from durable fallback");
            return Ok(fallback);
        }

        CacheMetrics::no_fallback(kind);
        error!(
            key = %key,
            attempts,
            class = %last_error.class(),
            error = %last_error,
            "No fallback available"
        );

        Err(NoFallbackAvailable {
            kind,
            location: key.location().clone(),
            last_error_class: last_error.class(),
            attempts,
            last_error: last_error.message().to_string(),
        })
    }
}

impl<T> Clone for CacheOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for CacheOrchestrator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheOrchestrator")
            .field("kind", &self.inner.kind)
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}
