//! Response cache layer with tenant-scoped keys and fail-open semantics.
//!
//! # Tenant Isolation
//!
//! [`ResponseCacheKey`] cannot be constructed without a tenant id. The tenant
//! is hashed together with the normalized question and also forms a readable
//! key prefix, so one tenant's entries can be listed or invalidated without
//! touching another's.
//!
//! # Failure Model
//!
//! A [`CacheStore`] may be unavailable at any time. [`ResponseCache`] turns
//! every store failure or timeout into a miss (reads) or a no-op (writes),
//! logging a warning. Answering a question never depends on the cache.

pub mod lmdb_backend;
pub mod memory;
pub mod pattern;
pub mod response;
pub mod tenant_key;
pub mod traits;

pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory::InMemoryCacheStore;
pub use pattern::glob_match;
pub use response::ResponseCache;
pub use tenant_key::{normalize_question, tenant_pattern, ResponseCacheKey, KEY_PREFIX};
pub use traits::{CacheStats, CacheStore};
