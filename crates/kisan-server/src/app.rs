//! Application builder.

use axum::Router;
use kisan_config::{AppConfig, DatabaseConfig, ObservabilityConfig, RedisConfig};
use kisan_core::{KisanError, KisanResult};
use kisan_repository::{create_pool, DurableCache, InMemoryDurableCache, MySqlDurableCache};
use kisan_rest::{create_router, AppState};
use kisan_service::{
    create_redis_pool, metrics::register_metrics, FastCache, ImdHttpClient, InMemoryFastCache,
    RedisFastCache, UpstreamClient, WeatherDataService,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Application builder for constructing the server.
pub struct AppBuilder {
    config: Option<AppConfig>,
    metrics: Option<PrometheusHandle>,
}

impl AppBuilder {
    /// Creates a new application builder.
    pub fn new() -> Self {
        Self {
            config: None,
            metrics: None,
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the Prometheus handle served at the metrics endpoint.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Connects the cache tiers and builds the router.
    pub async fn build(self) -> KisanResult<Router> {
        let config = self.config.unwrap_or_default();

        let fast = build_fast_cache(&config.redis).await?;
        let durable = build_durable_cache(&config.database).await?;
        let upstream: Arc<dyn UpstreamClient<Value>> = Arc::new(ImdHttpClient::new(&config.upstream)?);

        let service = WeatherDataService::new(&config.cache, upstream, fast, durable);
        let mut state = AppState::new(Arc::new(service));
        if let Some(handle) = self.metrics {
            state = state.with_metrics(handle);
        }

        Ok(create_router(state, &config.server, &config.observability))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates the fast tier: Redis when enabled, otherwise in-process.
pub async fn build_fast_cache(config: &RedisConfig) -> KisanResult<Arc<dyn FastCache>> {
    if config.enabled {
        let pool = create_redis_pool(config).await?;
        info!("Fast cache: Redis");
        Ok(Arc::new(RedisFastCache::new(Arc::new(pool))))
    } else {
        warn!("Redis disabled, using in-process fast cache");
        Ok(Arc::new(InMemoryFastCache::new()))
    }
}

/// Creates the durable tier: MySQL when enabled, otherwise in-process.
pub async fn build_durable_cache(config: &DatabaseConfig) -> KisanResult<Arc<dyn DurableCache>> {
    if config.enabled {
        let pool = create_pool(config).await?;
        info!("Durable cache: MySQL");
        Ok(Arc::new(MySqlDurableCache::new(pool)))
    } else {
        warn!("Database disabled, using in-process durable cache; fallbacks will not survive restarts");
        Ok(Arc::new(InMemoryDurableCache::new()))
    }
}

/// Installs the global Prometheus recorder when metrics are enabled.
pub fn install_metrics(config: &ObservabilityConfig) -> KisanResult<Option<PrometheusHandle>> {
    if !config.metrics_enabled {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| KisanError::Configuration(format!("Failed to install metrics recorder: {}", e)))?;
    register_metrics();
    Ok(Some(handle))
}
