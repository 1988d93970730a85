use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cache entry holding a memoized value and its expiration window.
///
/// The value is stored type-erased as an `Arc<dyn Any>` so that store
/// implementations stay type-agnostic: one store instance can hold results for
/// query families with different value types. Cloning an entry is cheap (it
/// only bumps the reference count); callers get owned values back via
/// [`CacheEntry::value`], never a handle into the store.
#[derive(Clone)]
pub struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    written_at: Instant,
    expires_at: Instant,
}

impl CacheEntry {
    /// Create an entry expiring `ttl` from now.
    ///
    /// A zero `ttl` produces an entry that is already expired; the descriptor
    /// boundary rejects zero TTLs before they reach a store through the
    /// coordinator, so this only arises when calling stores directly.
    pub fn new<V>(value: V, ttl: Duration) -> Self
    where
        V: Send + Sync + 'static,
    {
        Self::from_shared(Arc::new(value), ttl)
    }

    pub(crate) fn from_shared(value: Arc<dyn Any + Send + Sync>, ttl: Duration) -> Self {
        let written_at = Instant::now();
        CacheEntry {
            value,
            written_at,
            expires_at: written_at + ttl,
        }
    }

    /// Downcast the stored value back to `V` and clone it out.
    ///
    /// Returns `None` when the entry was produced under a different type,
    /// which means two logically different queries collapsed to one key.
    pub fn value<V>(&self) -> Option<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        self.value.downcast_ref::<V>().cloned()
    }

    /// When this entry was written.
    pub fn written_at(&self) -> Instant {
        self.written_at
    }

    /// When this entry stops being servable.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Entry age as of `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.written_at)
    }

    /// Whether the entry has reached hard expiration.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
