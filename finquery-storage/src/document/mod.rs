//! Read-only document store.
//!
//! The pipeline reads through [`DocumentStore`] only; no write path exists.
//! Callers are expected to have validated the collection against the
//! allow-list and applied tenant isolation before calling.

pub mod expr;
pub mod filter;
pub mod memory;
pub mod pipeline;
pub mod seed;

use async_trait::async_trait;
use finquery_core::{Collection, FinqueryResult, Record};
use serde_json::{Map, Value};

pub use memory::InMemoryDocumentStore;
pub use seed::{SeedData, SeedError};

/// Query surface of a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents matching `filter`, optionally projected.
    async fn find(
        &self,
        collection: Collection,
        filter: &Map<String, Value>,
        projection: Option<&Map<String, Value>>,
    ) -> FinqueryResult<Vec<Record>>;

    /// The first document matching `filter`, optionally projected.
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Map<String, Value>,
        projection: Option<&Map<String, Value>>,
    ) -> FinqueryResult<Option<Record>>;

    /// Run an aggregation pipeline over a collection.
    async fn aggregate(&self, collection: Collection, pipeline: &[Value])
        -> FinqueryResult<Vec<Record>>;

    /// Check that the store is reachable.
    async fn ping(&self) -> FinqueryResult<()>;

    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;
}
