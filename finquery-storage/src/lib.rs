//! FINQUERY Storage - Cache and Document Stores
//!
//! The two stateful collaborators of the query pipeline:
//!
//! - [`cache`]: the cache store abstraction with in-memory and LMDB backends,
//!   and the tenant-scoped [`ResponseCache`] on top of it.
//! - [`document`]: the read-only document store abstraction and an in-memory
//!   implementation that evaluates filters and aggregation pipelines.

pub mod cache;
pub mod config;
pub mod document;

pub use cache::{
    CacheStats, CacheStore, InMemoryCacheStore, LmdbCacheError, LmdbCacheStore, ResponseCache,
    ResponseCacheKey,
};
pub use config::{CacheBackendKind, StorageConfig};
pub use document::{DocumentStore, InMemoryDocumentStore, SeedData, SeedError};
