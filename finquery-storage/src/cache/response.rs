//! Response cache with fail-open semantics.
//!
//! Wraps a [`CacheStore`] and never lets a store failure reach the caller:
//! `get` degrades to a miss, `put` to a no-op, and `invalidate` to zero
//! deletions. Every store call is bounded by a timeout. Failures are logged
//! at `warn` and counted in [`CacheStats::errors`].

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use finquery_core::{CacheError, QueryResult, TenantId};
use tracing::{debug, warn};

use super::tenant_key::{tenant_pattern, ResponseCacheKey};
use super::traits::{CacheStats, CacheStore};

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    writes: AtomicU64,
}

/// Tenant-scoped, fail-open cache of full query results.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    timeout: Duration,
    counters: Arc<Counters>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            store,
            ttl,
            timeout,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Derive the cache key for a tenant's question.
    pub fn key(&self, tenant_id: &TenantId, question: &str) -> ResponseCacheKey {
        ResponseCacheKey::new(tenant_id, question)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    /// Look up a cached result. Absent on miss, on store failure, and on an
    /// entry that no longer decodes.
    pub async fn get(&self, key: &ResponseCacheKey) -> Option<QueryResult> {
        let raw = match self.bounded("get", self.store.get(key.as_str())).await {
            Ok(raw) => raw,
            Err(e) => {
                self.record_error("get", key, &e);
                return None;
            }
        };

        let Some(raw) = raw else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        match serde_json::from_str::<QueryResult>(&raw) {
            Ok(result) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(result)
            }
            Err(e) => {
                let err = CacheError::Serialization {
                    reason: e.to_string(),
                };
                self.record_error("decode", key, &err);
                None
            }
        }
    }

    /// Store a result with the default TTL.
    pub async fn put(&self, key: &ResponseCacheKey, result: &QueryResult) {
        self.put_with_ttl(key, result, self.ttl).await
    }

    /// Store a result with an explicit TTL. A failure is logged and ignored.
    pub async fn put_with_ttl(&self, key: &ResponseCacheKey, result: &QueryResult, ttl: Duration) {
        let mut stored = result.clone();
        stored.from_cache = false;

        let payload = match serde_json::to_string(&stored) {
            Ok(payload) => payload,
            Err(e) => {
                let err = CacheError::Serialization {
                    reason: e.to_string(),
                };
                self.record_error("encode", key, &err);
                return;
            }
        };

        match self
            .bounded("set", self.store.set_with_expiry(key.as_str(), &payload, ttl))
            .await
        {
            Ok(()) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, ttl_secs = ttl.as_secs(), "Cached query result");
            }
            Err(e) => self.record_error("set", key, &e),
        }
    }

    /// Delete every entry matching a glob pattern. Returns the number
    /// deleted, or zero if the store failed.
    pub async fn invalidate(&self, pattern: &str) -> u64 {
        let keys = match self.bounded("keys", self.store.keys_matching(pattern)).await {
            Ok(keys) => keys,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(pattern, error = %e, "Cache invalidation failed, nothing deleted");
                return 0;
            }
        };
        if keys.is_empty() {
            return 0;
        }

        match self.bounded("delete", self.store.delete(&keys)).await {
            Ok(deleted) => {
                debug!(pattern, deleted, "Invalidated cache entries");
                deleted
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(pattern, error = %e, "Cache invalidation failed, nothing deleted");
                0
            }
        }
    }

    /// Delete every entry belonging to one tenant.
    pub async fn invalidate_tenant(&self, tenant_id: &TenantId) -> u64 {
        self.invalidate(&tenant_pattern(tenant_id)).await
    }

    /// Whether the backing store answers a ping within the timeout.
    pub async fn is_available(&self) -> bool {
        self.bounded("ping", self.store.ping()).await.is_ok()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                debug!(op, timeout_ms = self.timeout.as_millis() as u64, "Cache call timed out");
                Err(CacheError::Timeout)
            }
        }
    }

    fn record_error(&self, op: &'static str, key: &ResponseCacheKey, err: &CacheError) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        warn!(
            op,
            backend = self.store.name(),
            tenant_id = %key.tenant_id(),
            error = %err,
            "Cache unavailable, continuing without it"
        );
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("backend", &self.store.name())
            .field("ttl", &self.ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use async_trait::async_trait;
    use finquery_core::{Collection, StructuredQuery, TenantContext};
    use serde_json::{json, Map};

    struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable {
                reason: "connection refused".into(),
            })
        }
        async fn set_with_expiry(&self, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable {
                reason: "connection refused".into(),
            })
        }
        async fn keys_matching(&self, _: &str) -> Result<Vec<String>, CacheError> {
            Err(CacheError::Unavailable {
                reason: "connection refused".into(),
            })
        }
        async fn delete(&self, _: &[String]) -> Result<u64, CacheError> {
            Err(CacheError::Unavailable {
                reason: "connection refused".into(),
            })
        }
        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable {
                reason: "connection refused".into(),
            })
        }
        fn name(&self) -> &'static str {
            "down"
        }
    }

    struct HangingStore;

    #[async_trait]
    impl CacheStore for HangingStore {
        async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
            std::future::pending().await
        }
        async fn set_with_expiry(&self, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
            std::future::pending().await
        }
        async fn keys_matching(&self, _: &str) -> Result<Vec<String>, CacheError> {
            std::future::pending().await
        }
        async fn delete(&self, _: &[String]) -> Result<u64, CacheError> {
            std::future::pending().await
        }
        async fn ping(&self) -> Result<(), CacheError> {
            std::future::pending().await
        }
        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    fn sample_result(tenant: &str) -> QueryResult {
        QueryResult::new(
            "how much did i spend on food",
            TenantContext::new(tenant, "Asha"),
            "You spent 4300 on food.",
            StructuredQuery::find(Collection::BankTransactions, Map::new()),
            vec![json!({ "amount": 2500 }), json!({ "amount": 1800 })],
        )
    }

    fn memory_cache() -> ResponseCache {
        ResponseCache::new(
            Arc::new(InMemoryCacheStore::new()),
            Duration::from_secs(60),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = memory_cache();
        let tenant = TenantId::new("user_1");
        let key = cache.key(&tenant, "How much did I spend on food?");
        assert!(cache.get(&key).await.is_none());

        let result = sample_result("user_1");
        cache.put(&key, &result).await;

        let cached = cache.get(&key).await.expect("entry should be cached");
        assert_eq!(cached.answer, result.answer);
        assert!(!cached.from_cache);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.writes), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_stored_copy_never_claims_from_cache() {
        let cache = memory_cache();
        let key = cache.key(&TenantId::new("user_1"), "q");
        cache.put(&key, &sample_result("user_1").into_cached()).await;
        assert!(!cache.get(&key).await.unwrap().from_cache);
    }

    #[tokio::test]
    async fn test_fail_open_when_store_down() {
        let cache = ResponseCache::new(Arc::new(DownStore), Duration::from_secs(60), Duration::from_secs(1));
        let key = cache.key(&TenantId::new("user_1"), "q");

        assert!(cache.get(&key).await.is_none());
        cache.put(&key, &sample_result("user_1")).await;
        assert_eq!(cache.invalidate("*").await, 0);
        assert!(!cache.is_available().await);
        assert_eq!(cache.stats().errors, 3);
    }

    #[tokio::test]
    async fn test_fail_open_when_store_hangs() {
        let cache = ResponseCache::new(
            Arc::new(HangingStore),
            Duration::from_secs(60),
            Duration::from_millis(20),
        );
        let key = cache.key(&TenantId::new("user_1"), "q");

        assert!(cache.get(&key).await.is_none());
        cache.put(&key, &sample_result("user_1")).await;
        assert_eq!(cache.stats().errors, 2);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = ResponseCache::new(store.clone(), Duration::from_secs(60), Duration::from_secs(1));
        let key = cache.key(&TenantId::new("user_1"), "q");
        store
            .set_with_expiry(key.as_str(), "not json", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.stats().errors, 1);
    }

    #[tokio::test]
    async fn test_invalidate_tenant_leaves_others() {
        let cache = memory_cache();
        let a = TenantId::new("user_1");
        let b = TenantId::new("user_2");
        for q in ["q1", "q2"] {
            cache.put(&cache.key(&a, q), &sample_result("user_1")).await;
        }
        cache.put(&cache.key(&b, "q1"), &sample_result("user_2")).await;

        assert_eq!(cache.invalidate_tenant(&a).await, 2);
        assert!(cache.get(&cache.key(&a, "q1")).await.is_none());
        assert!(cache.get(&cache.key(&b, "q1")).await.is_some());
    }
}
