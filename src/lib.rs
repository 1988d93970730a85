//! query-cache - A read-through result cache for asynchronous producers
//!
//! This library provides a per-key memoization layer with:
//! - Stale-while-revalidate semantics
//! - Request coalescing for concurrent misses
//! - Substring-based bulk invalidation
//! - Type-agnostic stores shared across value types
//!
//! # Example
//!
//! ```ignore
//! use query_cache::{MemoryStore, MemoryStoreConfig, QueryCoordinator, QueryDescriptor, Store};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
//!     let coordinator = QueryCoordinator::new(store);
//!
//!     let descriptor = QueryDescriptor::for_query(
//!         "coins.by_owner",
//!         &"user:123",
//!         Duration::from_secs(60),
//!     )?;
//!
//!     // Read-through: served from cache when fresh, refreshed in the
//!     // background when stale, produced on a miss.
//!     let coins: Vec<String> = coordinator
//!         .execute(&descriptor, || async {
//!             // Load from the backing service
//!             Ok::<_, std::io::Error>(vec!["denarius".to_string()])
//!         })
//!         .await?;
//!
//!     // After a write elsewhere, evict the affected family of queries.
//!     coordinator.invalidate(Some("user:123")).await;
//!     Ok(())
//! }
//! ```

mod coordinator;
mod descriptor;
mod entry;
mod error;
mod store;
pub mod stores;
mod utils;

// Re-export public API
pub use coordinator::QueryCoordinator;
pub use descriptor::QueryDescriptor;
pub use entry::CacheEntry;
pub use error::QueryError;
pub use store::Store;
pub use stores::memory::{EvictOnSetConfig, MemoryStore, MemoryStoreConfig};
pub use stores::metrics::{CacheMetric, MetricsSink, MetricsStore};
pub use stores::moka::{MokaStore, MokaStoreConfig};
