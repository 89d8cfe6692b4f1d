//! In-process durable cache, used when MySQL is disabled and in tests.

use crate::{DurableCache, DurableRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kisan_core::{CacheKey, KisanResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Durable cache backed by a `HashMap`. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryDurableCache {
    records: RwLock<HashMap<CacheKey, DurableRecord>>,
}

impl InMemoryDurableCache {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl DurableCache for InMemoryDurableCache {
    async fn get(&self, key: &CacheKey) -> KisanResult<Option<DurableRecord>> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn upsert(&self, key: &CacheKey, payload: &str, fetched_at: DateTime<Utc>) -> KisanResult<()> {
        let mut records = self.records.write();
        match records.get(key) {
            Some(existing) if existing.fetched_at > fetched_at => {
                debug!(key = %key, "Keeping newer durable record");
            }
            _ => {
                records.insert(
                    key.clone(),
                    DurableRecord {
                        payload: payload.to_string(),
                        fetched_at,
                    },
                );
            }
        }
        Ok(())
    }

    async fn purge_fetched_before(&self, cutoff: DateTime<Utc>) -> KisanResult<u64> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.fetched_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}
