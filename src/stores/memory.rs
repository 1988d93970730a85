use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::entry::CacheEntry;
use crate::store::Store;
use crate::utils::rand_simple;

/// Configuration for eviction on set operations.
#[derive(Debug, Clone)]
pub struct EvictOnSetConfig {
    /// Provide a number between 0 and 1 to calculate whether eviction should run on each set.
    ///
    /// - `1.0` -> run eviction on every `set`
    /// - `0.5` -> run eviction on every 2nd `set` (on average)
    /// - `0.0` -> disable eviction
    pub frequency: f64,

    /// Remove items until the number of items in the map is lower than `max_items`.
    pub max_items: usize,
}

/// Configuration for MemoryStore.
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreConfig {
    /// Sweep expired entries on `set` operations.
    ///
    /// This is an optional enhancement on top of the lazy check-on-read
    /// baseline; leaving it off keeps bookkeeping O(1) at the cost of expired
    /// entries lingering until touched or invalidated.
    pub evict_on_set: Option<EvictOnSetConfig>,
}

/// Baseline in-memory store using a HashMap behind an RwLock.
///
/// Suitable for:
/// - Low to moderate concurrency (<8 threads)
/// - Small to medium cache sizes (<1000 items)
/// - Applications prioritizing simplicity over performance
///
/// For high-concurrency scenarios, consider using [`MokaStore`](super::MokaStore) instead.
pub struct MemoryStore {
    state: RwLock<HashMap<String, CacheEntry>>,
    evict_on_set: Option<EvictOnSetConfig>,
}

impl MemoryStore {
    /// Create a new MemoryStore with the given configuration.
    pub fn new(config: MemoryStoreConfig) -> Self {
        MemoryStore {
            state: RwLock::new(HashMap::new()),
            evict_on_set: config.evict_on_set,
        }
    }

    /// Run eviction if configured and random check passes.
    async fn maybe_evict(&self) {
        let Some(ref config) = self.evict_on_set else {
            return;
        };

        if config.frequency <= 0.0 {
            return;
        }

        let should_evict = config.frequency >= 1.0 || rand_simple() < config.frequency;
        if !should_evict {
            return;
        }

        let mut state = self.state.write().await;
        let now = Instant::now();

        // First delete all expired entries
        state.retain(|_, entry| !entry.is_expired(now));

        // If still over max_items, remove entries closest to expiration
        if state.len() > config.max_items {
            let mut entries: Vec<_> = state
                .iter()
                .map(|(k, entry)| (k.clone(), entry.expires_at()))
                .collect();
            entries.sort_by_key(|(_, expires_at)| *expires_at);

            let to_remove = state.len() - config.max_items;
            for (key, _) in entries.into_iter().take(to_remove) {
                state.remove(&key);
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let state = self.state.read().await;
        let entry = state.get(key)?.clone();
        drop(state);

        if entry.is_expired(Instant::now()) {
            let mut state = self.state.write().await;
            // Re-check under the write lock: a fresh entry may have been
            // written for this key since the read.
            if state
                .get(key)
                .is_some_and(|e| e.is_expired(Instant::now()))
            {
                state.remove(key);
            }
            return None;
        }

        Some(entry)
    }

    async fn set(&self, key: &str, entry: CacheEntry) {
        {
            let mut state = self.state.write().await;
            state.insert(key.to_string(), entry);
        }

        self.maybe_evict().await;
    }

    async fn invalidate(&self, pattern: Option<&str>) {
        let mut state = self.state.write().await;
        match pattern {
            None => state.clear(),
            Some(pattern) => state.retain(|key, _| !key.contains(pattern)),
        }
    }

    async fn size(&self) -> usize {
        self.state.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_set() {
        let store = MemoryStore::new(MemoryStoreConfig::default());

        // Initially empty
        assert!(store.get("key1").await.is_none());

        store
            .set(
                "key1",
                CacheEntry::new("value1".to_string(), Duration::from_secs(60)),
            )
            .await;

        let entry = store.get("key1").await.unwrap();
        assert_eq!(entry.value::<String>(), Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_set_overwrites_unconditionally() {
        let store = MemoryStore::new(MemoryStoreConfig::default());

        store
            .set("key1", CacheEntry::new(1u32, Duration::from_secs(60)))
            .await;
        store
            .set("key1", CacheEntry::new(2u32, Duration::from_secs(60)))
            .await;

        assert_eq!(store.get("key1").await.unwrap().value::<u32>(), Some(2));
        assert_eq!(store.size().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_reclaimed_on_get() {
        let store = MemoryStore::new(MemoryStoreConfig::default());

        store
            .set(
                "key1",
                CacheEntry::new("value1".to_string(), Duration::from_millis(30)),
            )
            .await;

        // Occupancy counts the entry until it is touched
        assert_eq!(store.size().await, 1);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(store.get("key1").await.is_none());
        // The lookup reclaimed it
        assert_eq!(store.size().await, 0);
    }

    #[tokio::test]
    async fn test_size_counts_untouched_expired_entries() {
        let store = MemoryStore::new(MemoryStoreConfig::default());

        store
            .set("key1", CacheEntry::new((), Duration::from_millis(10)))
            .await;
        store
            .set("key2", CacheEntry::new((), Duration::from_secs(60)))
            .await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        // key1 is expired but has not been looked up or invalidated
        assert_eq!(store.size().await, 2);
    }

    #[tokio::test]
    async fn test_invalidate_by_substring() {
        let store = MemoryStore::new(MemoryStoreConfig::default());
        let ttl = Duration::from_secs(60);

        store.set("coins.list:user:42", CacheEntry::new((), ttl)).await;
        store.set("coins.detail:user:42:7", CacheEntry::new((), ttl)).await;
        store.set("coins.list:user:421", CacheEntry::new((), ttl)).await;
        store.set("stores.list:user:9", CacheEntry::new((), ttl)).await;

        store.invalidate(Some("user:42")).await;

        // Every key containing the substring is gone, including "user:421" —
        // substring matching is literal, which is why keys should delimit
        // embedded identifiers.
        assert!(store.get("coins.list:user:42").await.is_none());
        assert!(store.get("coins.detail:user:42:7").await.is_none());
        assert!(store.get("coins.list:user:421").await.is_none());
        assert!(store.get("stores.list:user:9").await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_without_pattern_clears_all() {
        let store = MemoryStore::new(MemoryStoreConfig::default());
        let ttl = Duration::from_secs(60);

        store.set("a", CacheEntry::new((), ttl)).await;
        store.set("b", CacheEntry::new((), ttl)).await;

        store.invalidate(None).await;

        assert_eq!(store.size().await, 0);
        assert!(store.get("a").await.is_none());
    }

    #[tokio::test]
    async fn test_evict_on_set_sweeps_expired_and_caps_size() {
        let store = MemoryStore::new(MemoryStoreConfig {
            evict_on_set: Some(EvictOnSetConfig {
                frequency: 1.0,
                max_items: 3,
            }),
        });

        store
            .set("expired", CacheEntry::new((), Duration::from_millis(1)))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        for i in 0..5 {
            store
                .set(&format!("key{i}"), CacheEntry::new(i, Duration::from_secs(60)))
                .await;
        }

        // The expired entry was swept and the live count capped at max_items
        assert!(store.get("expired").await.is_none());
        assert!(store.size().await <= 3);
    }
}
