//! Metrics middleware for cache stores.
//!
//! This module provides a `MetricsStore` wrapper that emits metrics for all
//! cache operations (reads, writes, invalidations) to a user-provided sink.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use query_cache::{MemoryStore, MemoryStoreConfig, MetricsStore, Store};
//!
//! let sink = Arc::new(MyMetricsSink::new());
//!
//! let memory = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
//! let store: Arc<dyn Store> = Arc::new(MetricsStore::new(memory, sink.clone()));
//!
//! // Use behind a QueryCoordinator - metrics emitted automatically
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::entry::CacheEntry;
use crate::store::Store;

/// Metrics emitted by the MetricsStore wrapper.
#[derive(Debug, Clone)]
pub enum CacheMetric {
    /// Emitted on every cache read (get) operation.
    Read {
        /// The cache key that was read.
        key: String,
        /// Whether the key was found and still servable.
        hit: bool,
        /// Age of the entry in milliseconds (only present when hit=true).
        age_ms: Option<f64>,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the wrapped store (from Store::name()).
        tier: String,
    },
    /// Emitted on every cache write (set) operation.
    Write {
        /// The cache key that was written.
        key: String,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the wrapped store (from Store::name()).
        tier: String,
    },
    /// Emitted on every invalidation.
    Invalidate {
        /// The substring pattern, or `None` for a full clear.
        pattern: Option<String>,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the wrapped store (from Store::name()).
        tier: String,
    },
}

/// Trait for receiving cache metrics.
///
/// Implement this trait to collect metrics from `MetricsStore`.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Emit a single metric.
    ///
    /// This is called synchronously in the hot path of cache operations.
    /// Implementations should be fast (e.g., buffer metrics in memory).
    fn emit(&self, metric: CacheMetric);

    /// Flush any buffered metrics.
    ///
    /// Typically called at shutdown or at periodic intervals.
    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A store wrapper that emits metrics for all operations.
///
/// `MetricsStore` wraps any `Store` implementation and emits metrics for
/// read, write, and invalidate operations to a user-provided sink. This is
/// the side channel on which producers of background-refresh traffic can be
/// observed without touching the caller-visible contract.
pub struct MetricsStore {
    inner: Arc<dyn Store>,
    sink: Arc<dyn MetricsSink>,
    tier_name: String,
}

impl MetricsStore {
    /// Create a new MetricsStore wrapping the given store.
    pub fn new(inner: Arc<dyn Store>, sink: Arc<dyn MetricsSink>) -> Self {
        let tier_name = inner.name().to_string();
        MetricsStore {
            inner,
            sink,
            tier_name,
        }
    }

    /// Get a reference to the metrics sink.
    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    fn elapsed_ms(start: Instant) -> f64 {
        start.elapsed().as_secs_f64() * 1000.0
    }
}

#[async_trait]
impl Store for MetricsStore {
    fn name(&self) -> &'static str {
        "metrics"
    }

    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let start = Instant::now();
        let result = self.inner.get(key).await;
        let latency_ms = Self::elapsed_ms(start);

        let (hit, age_ms) = match &result {
            Some(entry) => (
                true,
                Some(entry.age(Instant::now()).as_secs_f64() * 1000.0),
            ),
            None => (false, None),
        };

        self.sink.emit(CacheMetric::Read {
            key: key.to_string(),
            hit,
            age_ms,
            latency_ms,
            tier: self.tier_name.clone(),
        });

        result
    }

    async fn set(&self, key: &str, entry: CacheEntry) {
        let start = Instant::now();
        self.inner.set(key, entry).await;
        let latency_ms = Self::elapsed_ms(start);

        self.sink.emit(CacheMetric::Write {
            key: key.to_string(),
            latency_ms,
            tier: self.tier_name.clone(),
        });
    }

    async fn invalidate(&self, pattern: Option<&str>) {
        let start = Instant::now();
        self.inner.invalidate(pattern).await;
        let latency_ms = Self::elapsed_ms(start);

        self.sink.emit(CacheMetric::Invalidate {
            pattern: pattern.map(|p| p.to_string()),
            latency_ms,
            tier: self.tier_name.clone(),
        });
    }

    async fn size(&self) -> usize {
        self.inner.size().await
    }
}
