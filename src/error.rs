use std::sync::Arc;

/// Error type for query execution.
///
/// Store operations themselves never fail (absence is data, not an error);
/// the only runtime failure a caller can observe is the producer rejecting on
/// the miss path. The remaining variants are construction-time rejections at
/// the descriptor boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    /// The producer rejected while the caller was awaiting it.
    ///
    /// The source is reference-counted so that every coalesced caller awaiting
    /// the same in-flight invocation receives the same failure.
    #[error("producer failed for key '{key}': {source}")]
    ProducerFailure {
        key: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// The descriptor's expiration window is unusable.
    #[error("invalid expiry for key '{key}': {detail}")]
    InvalidExpiry { key: String, detail: &'static str },
    /// Query parameters could not be serialized into a cache key.
    #[error("failed to derive cache key for query '{name}': {detail}")]
    KeyDerivation { name: String, detail: String },
}

impl QueryError {
    /// Create a new producer failure.
    pub fn producer_failure<E>(key: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        QueryError::ProducerFailure {
            key: key.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn invalid_expiry(key: impl Into<String>, detail: &'static str) -> Self {
        QueryError::InvalidExpiry {
            key: key.into(),
            detail,
        }
    }
}
