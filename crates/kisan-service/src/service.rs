//! Weather data facade: one orchestrator per data kind over shared tiers.

use crate::cache::FastCache;
use crate::orchestrator::CacheOrchestrator;
use crate::upstream::UpstreamClient;
use chrono::{DateTime, Utc};
use kisan_config::CacheConfig;
use kisan_core::{
    CachedResponse, Clock, DataKind, KisanError, KisanResult, LocationKey, SystemClock,
};
use kisan_repository::DurableCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Fast cache state for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    /// Whether the fast cache holds an entry.
    pub valid: bool,
    /// Fetch time recorded with the entry.
    pub cached_at: Option<DateTime<Utc>>,
    /// Seconds until the entry expires.
    pub remaining_ttl_seconds: Option<u64>,
}

/// Serves every weather data kind through its own [`CacheOrchestrator`].
///
/// Payloads are kept as raw JSON; each kind carries the policy resolved
/// from [`CacheConfig::for_kind`].
#[derive(Clone)]
pub struct WeatherDataService {
    orchestrators: HashMap<DataKind, CacheOrchestrator<Value>>,
    fast: Arc<dyn FastCache>,
    durable: Arc<dyn DurableCache>,
}

impl WeatherDataService {
    /// Creates the service with the system clock.
    pub fn new(
        config: &CacheConfig,
        upstream: Arc<dyn UpstreamClient<Value>>,
        fast: Arc<dyn FastCache>,
        durable: Arc<dyn DurableCache>,
    ) -> Self {
        Self::with_clock(config, upstream, fast, durable, Arc::new(SystemClock))
    }

    /// Creates the service with an explicit clock.
    pub fn with_clock(
        config: &CacheConfig,
        upstream: Arc<dyn UpstreamClient<Value>>,
        fast: Arc<dyn FastCache>,
        durable: Arc<dyn DurableCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let orchestrators = DataKind::ALL
            .into_iter()
            .map(|kind| {
                let orchestrator = CacheOrchestrator::with_clock(
                    kind,
                    Arc::clone(&upstream),
                    Arc::clone(&fast),
                    Arc::clone(&durable),
                    config.for_kind(kind),
                    Arc::clone(&clock),
                );
                (kind, orchestrator)
            })
            .collect();

        info!(kinds = DataKind::ALL.len(), "Weather data service initialized");

        Self {
            orchestrators,
            fast,
            durable,
        }
    }

    /// Returns the orchestrator for `kind`.
    pub fn orchestrator(&self, kind: DataKind) -> KisanResult<&CacheOrchestrator<Value>> {
        self.orchestrators
            .get(&kind)
            .ok_or_else(|| KisanError::internal(format!("No orchestrator for {kind}")))
    }

    /// Reads data of `kind` for a location.
    pub async fn get(&self, kind: DataKind, district: &str, state: &str) -> KisanResult<CachedResponse<Value>> {
        self.orchestrator(kind)?.get(district, state).await
    }

    /// Returns whether the fast cache holds an entry. Never fetches.
    pub async fn is_valid(&self, kind: DataKind, district: &str, state: &str) -> KisanResult<bool> {
        self.orchestrator(kind)?.is_valid(district, state).await
    }

    /// Returns the fast cache state for one key.
    pub async fn cache_status(&self, kind: DataKind, district: &str, state: &str) -> KisanResult<CacheStatus> {
        let orchestrator = self.orchestrator(kind)?;
        let valid = orchestrator.is_valid(district, state).await?;
        let cached_at = orchestrator.cached_at(district, state).await?;
        let remaining_ttl_seconds = orchestrator
            .remaining_ttl(district, state)
            .await?
            .map(|ttl| ttl.as_secs());

        Ok(CacheStatus {
            valid,
            cached_at,
            remaining_ttl_seconds,
        })
    }

    /// Drops the fast cache entry for one key.
    pub async fn invalidate(&self, kind: DataKind, district: &str, state: &str) -> KisanResult<()> {
        self.orchestrator(kind)?.invalidate(district, state).await
    }

    /// Drops the fast cache entries of every kind for one location.
    pub async fn invalidate_location(&self, district: &str, state: &str) -> KisanResult<()> {
        let location = LocationKey::new(district, state)?;
        self.orchestrator(DataKind::SevenDayForecast)?
            .invalidator()
            .invalidate_location(&location)
            .await
    }

    /// Deletes durable rows fetched before `cutoff`.
    pub async fn purge_durable_before(&self, cutoff: DateTime<Utc>) -> KisanResult<u64> {
        let removed = self.durable.purge_fetched_before(cutoff).await?;
        info!(removed, cutoff = %cutoff, "Purged durable cache rows");
        Ok(removed)
    }

    /// Returns true when the fast cache backend is active.
    #[must_use]
    pub fn fast_cache_enabled(&self) -> bool {
        self.fast.is_enabled()
    }
}

impl std::fmt::Debug for WeatherDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherDataService")
            .field("kinds", &self.orchestrators.len())
            .finish_non_exhaustive()
    }
}
