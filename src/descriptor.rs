use serde::Serialize;
use std::time::Duration;

use crate::error::QueryError;

/// Identity and timing of a logical query.
///
/// The key must be a pure function of request identity: the same logical
/// request always produces the same key, and two different requests never
/// share one. [`QueryDescriptor::for_query`] derives such a key from a stable
/// query name plus serialized parameter values; keys built by hand should
/// include a delimiter around embedded identifiers so that substring
/// invalidation carries the intended granularity (`"user:42:"` rather than
/// `"user42"`).
///
/// `ttl` is the hard expiration window; `stale_after` is the point at which a
/// cached value is still servable but should be refreshed in the background.
/// It defaults to `ttl / 2` and must satisfy `0 < stale_after <= ttl`.
/// Zero windows are rejected at this boundary — callers that want no caching
/// must bypass the cache entirely rather than encode "never cache" as a TTL.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    key: String,
    ttl: Duration,
    stale_after: Duration,
}

impl QueryDescriptor {
    /// Create a descriptor with an explicit key. Rejects a zero `ttl`.
    pub fn new(key: impl Into<String>, ttl: Duration) -> Result<Self, QueryError> {
        let key = key.into();
        if ttl.is_zero() {
            return Err(QueryError::invalid_expiry(key, "ttl must be positive"));
        }
        Ok(QueryDescriptor {
            stale_after: ttl / 2,
            key,
            ttl,
        })
    }

    /// Create a descriptor whose key is derived from a query name and its
    /// parameters.
    ///
    /// Key format: `{name}:{params-as-json}`. Serialization is deterministic
    /// for struct and tuple parameters, which is what makes the key a pure
    /// function of request identity.
    ///
    /// # Example
    /// ```ignore
    /// let descriptor = QueryDescriptor::for_query(
    ///     "auctions.by_seller",
    ///     &("seller-9", 25u32),
    ///     Duration::from_secs(60),
    /// )?;
    /// ```
    pub fn for_query<P>(name: &str, params: &P, ttl: Duration) -> Result<Self, QueryError>
    where
        P: Serialize,
    {
        let params = serde_json::to_string(params).map_err(|e| QueryError::KeyDerivation {
            name: name.to_string(),
            detail: e.to_string(),
        })?;
        Self::new(format!("{name}:{params}"), ttl)
    }

    /// Override the staleness threshold. Rejects zero and values above `ttl`.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Result<Self, QueryError> {
        if stale_after.is_zero() {
            return Err(QueryError::invalid_expiry(
                self.key,
                "stale_after must be positive",
            ));
        }
        if stale_after > self.ttl {
            return Err(QueryError::invalid_expiry(
                self.key,
                "stale_after must not exceed ttl",
            ));
        }
        self.stale_after = stale_after;
        Ok(self)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }
}
