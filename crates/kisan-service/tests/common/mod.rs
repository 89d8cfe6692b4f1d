//! Shared fixtures for read path tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kisan_config::CachePolicy;
use kisan_core::{DataKind, LocationKey, ManualClock, UpstreamError};
use kisan_repository::InMemoryDurableCache;
use kisan_service::{CacheOrchestrator, InMemoryFastCache, UpstreamClient};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap()
}

/// Upstream replaying a script, recording when each call happened.
pub struct ScriptedUpstream {
    script: Mutex<VecDeque<Result<Value, UpstreamError>>>,
    calls: Mutex<Vec<Instant>>,
    latency: Duration,
}

impl ScriptedUpstream {
    pub fn new(script: impl IntoIterator<Item = Result<Value, UpstreamError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Gaps between consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        self.calls
            .lock()
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }
}

#[async_trait]
impl UpstreamClient<Value> for ScriptedUpstream {
    async fn fetch(&self, _kind: DataKind, _location: &LocationKey) -> Result<Value, UpstreamError> {
        self.calls.lock().push(Instant::now());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Err(UpstreamError::transient("503 Service Unavailable")))
    }
}

pub struct Harness {
    pub orchestrator: CacheOrchestrator<Value>,
    pub upstream: Arc<ScriptedUpstream>,
    pub fast: Arc<InMemoryFastCache>,
    pub durable: Arc<InMemoryDurableCache>,
    pub clock: ManualClock,
}

pub fn harness(upstream: ScriptedUpstream) -> Harness {
    harness_with_policy(upstream, CachePolicy::default())
}

pub fn harness_with_policy(upstream: ScriptedUpstream, policy: CachePolicy) -> Harness {
    let upstream = Arc::new(upstream);
    let fast = Arc::new(InMemoryFastCache::new());
    let durable = Arc::new(InMemoryDurableCache::new());
    let clock = ManualClock::new(start());
    let orchestrator = CacheOrchestrator::with_clock(
        DataKind::SevenDayForecast,
        upstream.clone(),
        fast.clone(),
        durable.clone(),
        policy,
        Arc::new(clock.clone()),
    );

    Harness {
        orchestrator,
        upstream,
        fast,
        durable,
        clock,
    }
}
