use async_trait::async_trait;

use crate::entry::CacheEntry;

/// A store is a common interface for the key -> entry table behind a
/// [`QueryCoordinator`](crate::QueryCoordinator).
///
/// Stores are type-agnostic: entries carry type-erased values, so the same
/// store instance can back coordinators producing different value types.
///
/// None of these operations fail — a missing or expired entry is `None`,
/// never an error. The methods are async because implementations guard shared
/// state with tokio primitives, but no store operation invokes a producer or
/// performs I/O.
#[async_trait]
pub trait Store: Send + Sync {
    /// A name for metrics/tracing.
    ///
    /// # Example
    /// - "memory"
    /// - "moka"
    fn name(&self) -> &'static str;

    /// Return the entry for `key` if it has not hard-expired.
    ///
    /// Expired entries are removed on lookup. This lazy check-on-read is the
    /// store's only self-cleaning mechanism; expired entries that are never
    /// touched again linger until an explicit `invalidate`.
    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Store `entry` under `key`, unconditionally overwriting any existing
    /// entry.
    async fn set(&self, key: &str, entry: CacheEntry);

    /// Remove entries in bulk.
    ///
    /// With `None`, clears the whole table. With `Some(pattern)`, removes
    /// every entry whose key contains `pattern` as a literal substring — not
    /// a regular expression. Keys must be constructed so that substrings
    /// carry the intended granularity.
    async fn invalidate(&self, pattern: Option<&str>);

    /// Number of entries currently held, including expired entries that have
    /// not been reclaimed yet. This reflects storage occupancy, not the live
    /// entry count.
    async fn size(&self) -> usize;
}
