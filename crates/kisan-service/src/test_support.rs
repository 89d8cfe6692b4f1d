//! Mocks and scripted fakes shared by unit tests.

use crate::cache::{FastCache, FastEntry};
use crate::upstream::UpstreamClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kisan_core::{CacheKey, DataKind, KisanResult, LocationKey, UpstreamError};
use kisan_repository::{DurableCache, DurableRecord, InMemoryDurableCache};
use mockall::mock;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

mock! {
    pub Durable {}

    #[async_trait]
    impl DurableCache for Durable {
        async fn get(&self, key: &CacheKey) -> KisanResult<Option<DurableRecord>>;
        async fn upsert(&self, key: &CacheKey, payload: &str, fetched_at: DateTime<Utc>) -> KisanResult<()>;
        async fn purge_fetched_before(&self, cutoff: DateTime<Utc>) -> KisanResult<u64>;
    }
}

mock! {
    pub Fast {}

    #[async_trait]
    impl FastCache for Fast {
        async fn get_entry(&self, key: &CacheKey) -> KisanResult<Option<FastEntry>>;
        async fn set_entry(
            &self,
            key: &CacheKey,
            payload: &str,
            fetched_at: DateTime<Utc>,
            ttl: Duration,
        ) -> KisanResult<()>;
        async fn delete(&self, key: &CacheKey) -> KisanResult<()>;
        async fn exists(&self, key: &CacheKey) -> KisanResult<bool>;
        async fn cached_at(&self, key: &CacheKey) -> KisanResult<Option<DateTime<Utc>>>;
        async fn remaining_ttl(&self, key: &CacheKey) -> KisanResult<Option<Duration>>;
    }
}

/// Upstream that replays a fixed sequence of outcomes.
///
/// Once the script runs out, every call fails transiently.
pub struct ScriptedUpstream<T> {
    script: Mutex<VecDeque<Result<T, UpstreamError>>>,
    calls: AtomicU32,
}

impl<T> ScriptedUpstream<T> {
    pub fn new(script: impl IntoIterator<Item = Result<T, UpstreamError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Send + Sync> UpstreamClient<T> for ScriptedUpstream<T> {
    async fn fetch(&self, _kind: DataKind, _location: &LocationKey) -> Result<T, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(UpstreamError::transient("script exhausted")))
    }
}

/// Durable tier whose upserts take `delay` before landing in memory.
pub struct SlowDurable {
    inner: InMemoryDurableCache,
    delay: Duration,
}

impl SlowDurable {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryDurableCache::new(),
            delay,
        }
    }
}

#[async_trait]
impl DurableCache for SlowDurable {
    async fn get(&self, key: &CacheKey) -> KisanResult<Option<DurableRecord>> {
        self.inner.get(key).await
    }

    async fn upsert(&self, key: &CacheKey, payload: &str, fetched_at: DateTime<Utc>) -> KisanResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert(key, payload, fetched_at).await
    }

    async fn purge_fetched_before(&self, cutoff: DateTime<Utc>) -> KisanResult<u64> {
        self.inner.purge_fetched_before(cutoff).await
    }
}
