//! Cache store trait and statistics.

use std::time::Duration;

use async_trait::async_trait;
use finquery_core::CacheError;
use serde::Serialize;

/// Key-value store with per-entry expiry.
///
/// Implementations may be remote and may be unavailable at any time; every
/// method reports failure through [`CacheError`] rather than panicking, and
/// the [`ResponseCache`](super::ResponseCache) above them decides to fail
/// open. Expiry is enforced by the store: an expired entry must never be
/// returned from `get`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live value.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value that expires after `ttl`. Overwrites any existing entry.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), CacheError>;

    /// List live keys matching a glob pattern (`*`, `?`).
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Delete keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;
}

/// Statistics about response cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned a cached result.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Store calls that failed or timed out (swallowed).
    pub errors: u64,
    /// Successful writes.
    pub writes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
