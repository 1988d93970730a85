use async_trait::async_trait;
use moka::future::Cache;
use std::time::{Duration, Instant};

use crate::entry::CacheEntry;
use crate::store::Store;

/// Configuration for MokaStore.
#[derive(Debug, Clone)]
pub struct MokaStoreConfig {
    /// Maximum number of entries the cache can hold.
    pub max_capacity: u64,

    /// Time to idle: entries are dropped if not accessed within this duration,
    /// independently of their own expiration stamps. `None` disables it.
    pub time_to_idle: Option<Duration>,
}

impl Default for MokaStoreConfig {
    fn default() -> Self {
        MokaStoreConfig {
            max_capacity: 10_000,
            time_to_idle: None,
        }
    }
}

/// High-performance concurrent store using Moka.
///
/// MokaStore provides lock-free concurrent access and automatic background
/// eviction, making it the better fit for high-concurrency workloads
/// (>8 threads) and large tables (>10,000 items).
///
/// Entry expiration is still checked against the entry's own stamps on every
/// `get`, so the lazy check-on-read guarantee holds regardless of Moka's own
/// housekeeping. `size()` is approximate: Moka counts entries it has not yet
/// reclaimed, which matches the occupancy semantics of the contract but may
/// briefly include entries a pattern invalidation has already marked.
pub struct MokaStore {
    cache: Cache<String, CacheEntry>,
}

impl MokaStore {
    /// Create a new MokaStore with the given configuration.
    pub fn new(config: MokaStoreConfig) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_capacity)
            .support_invalidation_closures();

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        MokaStore {
            cache: builder.build(),
        }
    }
}

#[async_trait]
impl Store for MokaStore {
    fn name(&self) -> &'static str {
        "moka"
    }

    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.cache.get(key).await?;

        if entry.is_expired(Instant::now()) {
            self.cache.invalidate(key).await;
            return None;
        }

        Some(entry)
    }

    async fn set(&self, key: &str, entry: CacheEntry) {
        self.cache.insert(key.to_string(), entry).await;
    }

    async fn invalidate(&self, pattern: Option<&str>) {
        match pattern {
            None => self.cache.invalidate_all(),
            Some(pattern) => {
                let pattern = pattern.to_string();
                if let Err(e) = self
                    .cache
                    .invalidate_entries_if(move |key, _| key.contains(&pattern))
                {
                    tracing::warn!(error = %e, "pattern invalidation failed");
                }
            }
        }
    }

    async fn size(&self) -> usize {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count() as usize
    }
}
