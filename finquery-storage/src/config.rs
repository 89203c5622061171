//! Storage configuration.

use std::path::PathBuf;
use std::sync::Arc;

use finquery_core::config::env_parse;
use finquery_core::ConfigError;

use crate::cache::{CacheStore, InMemoryCacheStore, LmdbCacheError, LmdbCacheStore};
use crate::document::{InMemoryDocumentStore, SeedData, SeedError};

/// Which cache store backs the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// Process-local map. Lost on restart.
    Memory,
    /// LMDB file under `lmdb_path`.
    Lmdb,
    /// No cache; every question runs the full pipeline.
    Disabled,
}

impl std::str::FromStr for CacheBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "lmdb" => Ok(Self::Lmdb),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            other => Err(ConfigError::InvalidValue {
                field: "FINQUERY_CACHE_BACKEND".to_string(),
                value: other.to_string(),
                reason: "expected memory, lmdb or disabled".to_string(),
            }),
        }
    }
}

/// Cache and document store settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub cache_backend: CacheBackendKind,
    /// Directory for the LMDB environment.
    pub lmdb_path: PathBuf,
    /// LMDB map size in megabytes.
    pub lmdb_max_size_mb: usize,
    /// JSON seed file for the document store. `None` loads the demo data.
    pub seed_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_backend: CacheBackendKind::Memory,
            lmdb_path: PathBuf::from("./data/cache"),
            lmdb_max_size_mb: 256,
            seed_path: None,
        }
    }
}

impl StorageConfig {
    /// Create StorageConfig from environment variables.
    ///
    /// Environment variables:
    /// - `FINQUERY_CACHE_BACKEND`: `memory`, `lmdb` or `disabled` (default: memory)
    /// - `FINQUERY_LMDB_PATH`: LMDB directory (default: ./data/cache)
    /// - `FINQUERY_LMDB_MAX_SIZE_MB`: LMDB map size (default: 256)
    /// - `FINQUERY_SEED_PATH`: JSON seed file (default: built-in demo data)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            cache_backend: env_parse("FINQUERY_CACHE_BACKEND", defaults.cache_backend)?,
            lmdb_path: std::env::var("FINQUERY_LMDB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.lmdb_path),
            lmdb_max_size_mb: env_parse("FINQUERY_LMDB_MAX_SIZE_MB", defaults.lmdb_max_size_mb)?,
            seed_path: std::env::var("FINQUERY_SEED_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// Open the configured cache store. `None` when caching is disabled.
    pub fn open_cache_store(&self) -> Result<Option<Arc<dyn CacheStore>>, LmdbCacheError> {
        let store: Arc<dyn CacheStore> = match self.cache_backend {
            CacheBackendKind::Memory => Arc::new(InMemoryCacheStore::new()),
            CacheBackendKind::Lmdb => Arc::new(LmdbCacheStore::open(
                &self.lmdb_path,
                self.lmdb_max_size_mb,
            )?),
            CacheBackendKind::Disabled => return Ok(None),
        };
        Ok(Some(store))
    }

    /// Load the document store from the seed file, or the demo data.
    pub fn load_document_store(&self) -> Result<InMemoryDocumentStore, SeedError> {
        let seed = match &self.seed_path {
            Some(path) => SeedData::from_path(path)?,
            None => SeedData::demo()?,
        };
        Ok(InMemoryDocumentStore::from_seed(&seed))
    }
}
