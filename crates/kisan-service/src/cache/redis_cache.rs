//! Redis-based fast cache implementation.

use super::fast_cache::{decode_pair, decode_timestamp, encode_timestamp, FastCache, FastEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};
use kisan_config::RedisConfig;
use kisan_core::{CacheKey, KisanError, KisanResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Creates a Redis connection pool.
///
/// An unreachable server is logged but not fatal; fast cache reads then
/// degrade to misses until it comes back.
pub async fn create_redis_pool(config: &RedisConfig) -> KisanResult<Pool> {
    info!("Creating Redis connection pool...");

    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| KisanError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size as usize)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| KisanError::Configuration(format!("Failed to create Redis pool: {}", e)))?;

    match pool.get().await {
        Ok(mut conn) => {
            let pong: Result<String, _> = deadpool_redis::redis::cmd("PING").query_async(&mut conn).await;
            match pong {
                Ok(_) => info!("Redis connection pool created successfully"),
                Err(e) => warn!(error = %e, "Redis did not answer PING"),
            }
        }
        Err(e) => warn!(error = %e, "Redis is unreachable, fast cache reads will miss"),
    }

    Ok(pool)
}

/// Redis-based fast cache.
///
/// Pairs are replaced with one `MULTI`/`EXEC` transaction and read with one
/// `MGET`, so readers never see half of a pair.
pub struct RedisFastCache {
    /// Redis connection pool.
    pool: Option<Arc<Pool>>,
}

impl RedisFastCache {
    /// Create a new Redis fast cache.
    #[must_use]
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool: Some(pool) }
    }

    /// Create a no-op cache (every read misses, every write is dropped).
    #[must_use]
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> KisanResult<deadpool_redis::Connection> {
        match &self.pool {
            Some(pool) => pool.get().await.map_err(|e| {
                KisanError::Cache(format!("Failed to get Redis connection: {}", e))
            }),
            None => Err(KisanError::Cache("Cache is disabled".to_string())),
        }
    }
}

#[async_trait]
impl FastCache for RedisFastCache {
    fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    async fn get_entry(&self, key: &CacheKey) -> KisanResult<Option<FastEntry>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let payload_key = key.payload_key();
        let mut conn = self.get_conn().await?;
        let mut values: Vec<Option<String>> = conn
            .mget(&[payload_key.as_str(), key.timestamp_key().as_str()])
            .await
            .map_err(|e| KisanError::Cache(format!("Failed to get key '{}': {}", payload_key, e)))?;

        let timestamp = values.pop().flatten();
        let payload = values.pop().flatten();
        let entry = decode_pair(key, payload, timestamp);

        match &entry {
            Some(_) => debug!("Cache hit for key '{}'", payload_key),
            None => debug!("Cache miss for key '{}'", payload_key),
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
        if !self.is_enabled() {
            return Ok(());
        }

        let payload_key = key.payload_key();
        let timestamp_key = key.timestamp_key();
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.get_conn().await?;

        let _: () = deadpool_redis::redis::pipe()
            .atomic()
            .del(&[payload_key.as_str(), timestamp_key.as_str()])
            .ignore()
            .set_ex(&payload_key, payload, ttl_secs)
            .ignore()
            .set_ex(&timestamp_key, encode_timestamp(fetched_at), ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| KisanError::Cache(format!("Failed to set key '{}': {}", payload_key, e)))?;

        debug!("Cached key '{}' with TTL {}s", payload_key, ttl_secs);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> KisanResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let payload_key = key.payload_key();
        let mut conn = self.get_conn().await?;
        let deleted: i64 = conn
            .del(&[payload_key.as_str(), key.timestamp_key().as_str()])
            .await
            .map_err(|e| KisanError::Cache(format!("Failed to delete key '{}': {}", payload_key, e)))?;

        debug!("Deleted key '{}': {}", payload_key, deleted > 0);
        Ok(())
    }

    async fn exists(&self, key: &CacheKey) -> KisanResult<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }

        let payload_key = key.payload_key();
        let mut conn = self.get_conn().await?;
        let exists: bool = conn
            .exists(&payload_key)
            .await
            .map_err(|e| KisanError::Cache(format!("Failed to check key '{}': {}", payload_key, e)))?;

        Ok(exists)
    }

    async fn cached_at(&self, key: &CacheKey) -> KisanResult<Option<DateTime<Utc>>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let timestamp_key = key.timestamp_key();
        let mut conn = self.get_conn().await?;
        let raw: Option<String> = conn
            .get(&timestamp_key)
            .await
            .map_err(|e| KisanError::Cache(format!("Failed to get key '{}': {}", timestamp_key, e)))?;

        Ok(raw.and_then(|raw| decode_timestamp(key, &raw)))
    }

    async fn remaining_ttl(&self, key: &CacheKey) -> KisanResult<Option<Duration>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let payload_key = key.payload_key();
        let mut conn = self.get_conn().await?;
        let millis: i64 = conn
            .pttl(&payload_key)
            .await
            .map_err(|e| KisanError::Cache(format!("Failed to read TTL of '{}': {}", payload_key, e)))?;

        // -2: missing, -1: no expiry
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }
}

impl std::fmt::Debug for RedisFastCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisFastCache")
            .field("enabled", &self.pool.is_some())
            .finish()
    }
}
