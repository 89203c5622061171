//! Process-local cache store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use finquery_core::CacheError;

use super::pattern::glob_match;
use super::traits::CacheStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory cache store. Expiry is checked on every read; expired entries
/// are swept when keys are listed.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including any not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> CacheError {
    CacheError::Unavailable {
        reason: "in-memory cache lock poisoned".to_string(),
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(CacheError::InvalidTtl {
                ttl_secs: ttl.as_secs(),
            })?;
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(keys.iter().filter(|key| entries.remove(*key).is_some()).count() as u64)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryCacheStore::new();
        store
            .set_with_expiry("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let store = InMemoryCacheStore::new();
        store
            .set_with_expiry("k", "v", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.keys_matching("*").await.unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_rejected() {
        let store = InMemoryCacheStore::new();
        let err = store
            .set_with_expiry("k", "v", Duration::from_secs(u64::MAX))
            .await
            .unwrap_err();
        assert_eq!(err, CacheError::InvalidTtl { ttl_secs: u64::MAX });
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keys_matching_and_delete() {
        let store = InMemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        for key in ["t:a:1", "t:a:2", "t:b:1"] {
            store.set_with_expiry(key, "v", ttl).await.unwrap();
        }

        let keys = store.keys_matching("t:a:*").await.unwrap();
        assert_eq!(keys, vec!["t:a:1".to_string(), "t:a:2".to_string()]);

        let deleted = store
            .delete(&[keys[0].clone(), "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.len(), 2);
    }
}
