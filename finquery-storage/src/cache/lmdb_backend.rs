//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a persistent,
//! memory-mapped cache that survives process restarts.
//!
//! # Value Format
//!
//! Each value is stored as `[expires_at: 8 bytes LE millis][utf-8 payload]`.
//! Entries past their expiry are treated as absent and deleted lazily by
//! `keys_matching`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use finquery_core::CacheError;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::pattern::glob_match;
use super::traits::CacheStore;

const HEADER_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored bytes could not be decoded.
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CacheError {
    fn from(e: LmdbCacheError) -> Self {
        CacheError::Unavailable {
            reason: e.to_string(),
        }
    }
}

fn txn_err(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// LMDB-backed cache store.
pub struct LmdbCacheStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbCacheStore {
    /// Open (or create) an LMDB cache under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the LMDB
    /// environment or database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per path by this process and
        // the mapped file is not modified outside LMDB.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self { env, db })
    }

    fn encode(value: &str, expires_at_ms: i64) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + value.len());
        bytes.extend_from_slice(&expires_at_ms.to_le_bytes());
        bytes.extend_from_slice(value.as_bytes());
        bytes
    }

    fn expires_at(bytes: &[u8]) -> Result<i64, LmdbCacheError> {
        let header: [u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(|| LmdbCacheError::Corrupt("missing expiry header".into()))?;
        Ok(i64::from_le_bytes(header))
    }

    fn decode(bytes: &[u8], now_ms: i64) -> Result<Option<String>, LmdbCacheError> {
        if Self::expires_at(bytes)? <= now_ms {
            return Ok(None);
        }
        let payload = std::str::from_utf8(&bytes[HEADER_LEN..])
            .map_err(|e| LmdbCacheError::Corrupt(e.to_string()))?;
        Ok(Some(payload.to_string()))
    }

    /// Scan all keys, splitting them into live matches and expired keys.
    fn scan(&self, pattern: &str, now_ms: i64) -> Result<(Vec<String>, Vec<Vec<u8>>), LmdbCacheError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let mut live = Vec::new();
        let mut expired = Vec::new();

        for item in self.db.iter(&rtxn).map_err(txn_err)? {
            let (key, value) = item.map_err(txn_err)?;
            let fresh = Self::expires_at(value).map(|at| at > now_ms).unwrap_or(false);
            if !fresh {
                expired.push(key.to_vec());
                continue;
            }
            if let Ok(key) = std::str::from_utf8(key) {
                if glob_match(pattern, key) {
                    live.push(key.to_string());
                }
            }
        }
        Ok((live, expired))
    }

    fn delete_raw<'a>(&self, keys: impl Iterator<Item = &'a [u8]>) -> Result<u64, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let mut deleted = 0u64;
        for key in keys {
            if self.db.delete(&mut wtxn, key).map_err(txn_err)? {
                deleted += 1;
            }
        }
        wtxn.commit().map_err(txn_err)?;
        Ok(deleted)
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        match self.db.get(&rtxn, key.as_bytes()).map_err(txn_err)? {
            Some(bytes) => Ok(Self::decode(bytes, Utc::now().timestamp_millis())?),
            None => Ok(None),
        }
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let expires_at = i64::try_from(ttl.as_millis())
            .ok()
            .and_then(|millis| Utc::now().timestamp_millis().checked_add(millis))
            .ok_or(CacheError::InvalidTtl {
                ttl_secs: ttl.as_secs(),
            })?;
        let bytes = Self::encode(value, expires_at);

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), &bytes)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(())
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let (mut live, expired) = self.scan(pattern, Utc::now().timestamp_millis())?;
        if !expired.is_empty() {
            self.delete_raw(expired.iter().map(Vec::as_slice))?;
        }
        live.sort();
        Ok(live)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        Ok(self.delete_raw(keys.iter().map(|k| k.as_bytes()))?)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.env.read_txn().map_err(txn_err)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "lmdb"
    }
}
