//! MySQL durable cache implementation.

use crate::{DatabasePoolInterface, DurableCache, DurableRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kisan_core::{CacheKey, KisanResult};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::debug;

/// Durable cache stored in the `perishable_cache` table.
#[derive(Clone)]
pub struct MySqlDurableCache {
    pool: Arc<dyn DatabasePoolInterface>,
}

impl MySqlDurableCache {
    /// Creates a new MySQL durable cache.
    #[must_use]
    pub fn new(pool: Arc<dyn DatabasePoolInterface>) -> Self {
        Self { pool }
    }
}

/// Database row representation of a durable record.
#[derive(Debug, FromRow)]
struct PerishableRow {
    payload: String,
    fetched_at: DateTime<Utc>,
}

impl From<PerishableRow> for DurableRecord {
    fn from(row: PerishableRow) -> Self {
        Self {
            payload: row.payload,
            fetched_at: row.fetched_at,
        }
    }
}

#[async_trait]
impl DurableCache for MySqlDurableCache {
    async fn get(&self, key: &CacheKey) -> KisanResult<Option<DurableRecord>> {
        debug!(key = %key, "Reading durable record");

        let row = sqlx::query_as::<_, PerishableRow>(
            r#"
            SELECT payload, fetched_at
            FROM perishable_cache
            WHERE domain = ? AND district = ? AND state = ? AND kind = ?
            "#,
        )
        .bind(key.kind().domain())
        .bind(key.location().district())
        .bind(key.location().state())
        .bind(key.kind().token())
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(DurableRecord::from))
    }

    async fn upsert(&self, key: &CacheKey, payload: &str, fetched_at: DateTime<Utc>) -> KisanResult<()> {
        debug!(key = %key, fetched_at = %fetched_at, "Upserting durable record");

        // Assignments run left to right: payload must be compared against the old fetched_at.
        sqlx::query(
            r#"
            INSERT INTO perishable_cache (domain, district, state, kind, payload, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                payload = IF(VALUES(fetched_at) >= fetched_at, VALUES(payload), payload),
                fetched_at = GREATEST(fetched_at, VALUES(fetched_at))
            "#,
        )
        .bind(key.kind().domain())
        .bind(key.location().district())
        .bind(key.location().state())
        .bind(key.kind().token())
        .bind(payload)
        .bind(fetched_at)
        .execute(self.pool.inner())
        .await?;

        Ok(())
    }

    async fn purge_fetched_before(&self, cutoff: DateTime<Utc>) -> KisanResult<u64> {
        let result = sqlx::query("DELETE FROM perishable_cache WHERE fetched_at < ?")
            .bind(cutoff)
            .execute(self.pool.inner())
            .await?;

        debug!(cutoff = %cutoff, purged = result.rows_affected(), "Purged durable records");
        Ok(result.rows_affected())
    }
}

impl std::fmt::Debug for MySqlDurableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlDurableCache").finish_non_exhaustive()
    }
}
