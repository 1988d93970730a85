use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::watch;

use crate::descriptor::QueryDescriptor;
use crate::entry::CacheEntry;
use crate::error::QueryError;
use crate::store::Store;

/// Outcome of one producer invocation, fanned out to every caller awaiting it.
type FlightResult = Result<Arc<dyn Any + Send + Sync>, QueryError>;

/// Per-key in-flight markers. `None` in the channel means the producer is
/// still running; `Some` carries its outcome.
type Flights = HashMap<String, watch::Receiver<Option<FlightResult>>>;

type FlightMap = Mutex<Flights>;

fn lock_flights(map: &FlightMap) -> MutexGuard<'_, Flights> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases a key's in-flight slot when the owning fetch or refresh ends,
/// including when the owner is cancelled mid-await.
struct FlightGuard {
    inflight: Arc<FlightMap>,
    key: String,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        lock_flights(&self.inflight).remove(&self.key);
    }
}

/// Wait for an in-flight producer invocation to publish its outcome.
///
/// Returns `None` if the flight was abandoned without publishing (its owner
/// was cancelled), in which case the caller should retry the lookup.
async fn await_flight(mut rx: watch::Receiver<Option<FlightResult>>) -> Option<FlightResult> {
    loop {
        let published = rx.borrow_and_update().as_ref().cloned();
        if let Some(result) = published {
            return Some(result);
        }
        if rx.changed().await.is_err() {
            // Sender dropped; it may still have published just before.
            return rx.borrow().as_ref().cloned();
        }
    }
}

/// Read-through query execution against a [`Store`].
///
/// `execute` decides, per call, whether to serve a cached value, serve a
/// stale value while refreshing in the background, or block until the
/// producer yields a fresh one:
/// - **Fresh hit** (age below the descriptor's `stale_after`): return the
///   cached value, no side effects.
/// - **Stale hit** (age between `stale_after` and `ttl`): return the cached
///   value immediately and spawn at most one background refresh for the key.
/// - **Miss or hard-expired**: invoke the producer and await it, writing the
///   result back on success. Concurrent callers for the same key share the
///   single outstanding invocation instead of each invoking their own
///   producer.
///
/// The coordinator holds no state beyond the per-key in-flight markers; the
/// store owns every entry. One coordinator instance must own a logical key
/// domain — two coordinators over different stores sharing key strings would
/// reintroduce duplicate producer calls.
///
/// The coordinator never cancels a producer and imposes no timeout: a hung
/// producer hangs the miss path for every caller of that key. Callers that
/// need deadlines must build them into the producer itself.
#[derive(Clone)]
pub struct QueryCoordinator {
    store: Arc<dyn Store>,
    inflight: Arc<FlightMap>,
}

impl QueryCoordinator {
    /// Create a coordinator over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        QueryCoordinator {
            store,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The store backing this coordinator.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Evict cached entries after a write elsewhere invalidated them.
    ///
    /// `Some(pattern)` removes every entry whose key contains the substring;
    /// `None` clears the store. An invalidation racing an in-flight refresh
    /// does not stop its write-back — the value being written was valid at
    /// fetch time, an accepted staleness window.
    pub async fn invalidate(&self, pattern: Option<&str>) {
        self.store.invalidate(pattern).await;
    }

    /// Execute the query identified by `descriptor`, producing through
    /// `producer` on a miss or in the background on a stale hit.
    ///
    /// Producer failures surface as [`QueryError::ProducerFailure`] only on
    /// the miss path and store nothing; a failed background refresh leaves
    /// the existing entry untouched and is never seen by the caller, who
    /// already received a value.
    pub async fn execute<V, F, Fut, E>(
        &self,
        descriptor: &QueryDescriptor,
        producer: F,
    ) -> Result<V, QueryError>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let key = descriptor.key();

        if let Some(entry) = self.store.get(key).await {
            // The store never returns a hard-expired entry.
            let age = entry.age(Instant::now());
            match entry.value::<V>() {
                Some(value) if age < descriptor.stale_after() => {
                    return Ok(value);
                }
                Some(value) => {
                    self.spawn_refresh(descriptor, producer);
                    return Ok(value);
                }
                None => {
                    tracing::warn!(key, "cached value has a different type; treating as a miss");
                }
            }
        }

        self.fetch_coalesced(descriptor, producer).await
    }

    /// Miss path: invoke the producer, coalescing concurrent callers of the
    /// same key onto the single outstanding invocation.
    async fn fetch_coalesced<V, F, Fut, E>(
        &self,
        descriptor: &QueryDescriptor,
        producer: F,
    ) -> Result<V, QueryError>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let key = descriptor.key();

        // Join a flight already in progress, or claim leadership. The loop
        // only repeats when a joined flight was abandoned by a cancelled
        // leader.
        let (tx, _guard) = loop {
            let rx = {
                let mut flights = lock_flights(&self.inflight);
                match flights.get(key) {
                    Some(rx) => rx.clone(),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        flights.insert(key.to_string(), rx);
                        break (
                            tx,
                            FlightGuard {
                                inflight: Arc::clone(&self.inflight),
                                key: key.to_string(),
                            },
                        );
                    }
                }
            };

            match await_flight(rx).await {
                Some(Ok(shared)) => match shared.downcast::<V>() {
                    Ok(value) => return Ok((*value).clone()),
                    Err(_) => {
                        tracing::warn!(key, "coalesced result has a different type; retrying");
                    }
                },
                Some(Err(err)) => return Err(err),
                None => {}
            }
            // Let the abandoned flight's guard clear the slot before retrying.
            tokio::task::yield_now().await;
        };

        // Leader: the in-flight marker is claimed before the producer is
        // polled and held until the write-back completes, so every caller
        // interleaved across this await observes it.
        match producer().await {
            Ok(value) => {
                let result = value.clone();
                let shared: Arc<dyn Any + Send + Sync> = Arc::new(value);
                self.store
                    .set(
                        key,
                        CacheEntry::from_shared(Arc::clone(&shared), descriptor.ttl()),
                    )
                    .await;
                let _ = tx.send(Some(Ok(shared)));
                Ok(result)
            }
            Err(err) => {
                // A failed fetch must not poison the cache: store nothing.
                let err = QueryError::producer_failure(key, err);
                let _ = tx.send(Some(Err(err.clone())));
                Err(err)
            }
        }
    }

    /// Stale path: refresh the key in the background unless a fetch or
    /// refresh already owns it.
    fn spawn_refresh<V, F, Fut, E>(&self, descriptor: &QueryDescriptor, producer: F)
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let store = Arc::clone(&self.store);
        let inflight = Arc::clone(&self.inflight);
        let key = descriptor.key().to_string();
        let ttl = descriptor.ttl();

        tokio::spawn(async move {
            let (tx, _guard) = {
                let mut flights = lock_flights(&inflight);
                if flights.contains_key(&key) {
                    // A fetch or refresh already owns this key.
                    return;
                }
                let (tx, rx) = watch::channel(None);
                flights.insert(key.clone(), rx);
                let guard = FlightGuard {
                    inflight: Arc::clone(&inflight),
                    key: key.clone(),
                };
                (tx, guard)
            };

            match producer().await {
                Ok(value) => {
                    let shared: Arc<dyn Any + Send + Sync> = Arc::new(value);
                    store
                        .set(&key, CacheEntry::from_shared(Arc::clone(&shared), ttl))
                        .await;
                    let _ = tx.send(Some(Ok(shared)));
                }
                Err(err) => {
                    // The caller already holds a servable value; contain the
                    // failure and keep the aged entry.
                    tracing::warn!(key = %key, error = %err, "background refresh failed");
                    let _ = tx.send(Some(Err(QueryError::producer_failure(&key, err))));
                }
            }
        });
    }
}
