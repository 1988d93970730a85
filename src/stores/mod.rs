//! Store implementations for the cache library.

pub mod memory;
pub mod metrics;
pub mod moka;

pub use memory::{EvictOnSetConfig, MemoryStore, MemoryStoreConfig};
pub use metrics::{CacheMetric, MetricsSink, MetricsStore};
pub use moka::{MokaStore, MokaStoreConfig};
