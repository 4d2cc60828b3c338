//! Cache backend client seam.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache backend call timed out")]
    Timeout,
    #[error("cache payload could not be serialized: {0}")]
    Serialization(String),
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }
}

/// Key/value store with TTLs plus one sorted member → score structure per
/// entity kind.
///
/// Implementations are shared, externally-synchronized resources.
/// `increment_score` must be atomic at the backend: callers never do a
/// read-modify-write, so concurrent increments on the same member cannot
/// lose updates.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Remove every key under `namespace`. Atomic from the caller's point
    /// of view: a `get` issued after this returns must not observe any
    /// pre-evict entry.
    async fn delete_namespace(&self, namespace: &str) -> Result<(), CacheError>;

    /// Add `delta` to `member`'s score on `board`, creating the member at
    /// `delta` when absent. Returns the new score.
    async fn increment_score(
        &self,
        board: &str,
        member: &str,
        delta: f64,
    ) -> Result<f64, CacheError>;

    /// Members of `board` ordered by score descending, from rank `start`
    /// through rank `stop` inclusive (zero-based).
    async fn range_by_score_desc(
        &self,
        board: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, CacheError>;

    async fn remove_member(&self, board: &str, member: &str) -> Result<(), CacheError>;
}
