//! In-memory document store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use finquery_core::{Collection, FinqueryResult, QueryError, Record};
use serde_json::{Map, Value};

use super::expr::project;
use super::filter::matches;
use super::pipeline;
use super::seed::SeedData;
use super::DocumentStore;

/// Document store holding each collection as a vector of JSON documents.
///
/// Queries work on snapshots: a reader clones the collection's `Arc` and
/// releases the lock before evaluating, so no lock is held while a query
/// runs and stored documents are never mutated by a query.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Arc<Vec<Record>>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from seed data.
    pub fn from_seed(seed: &SeedData) -> Self {
        let store = Self::new();
        for collection in Collection::ALL {
            store.replace(collection, seed.documents(collection).to_vec());
        }
        store
    }

    /// Builder form of [`replace`](Self::replace).
    pub fn with_documents(self, collection: Collection, docs: Vec<Record>) -> Self {
        self.replace(collection, docs);
        self
    }

    /// Replace a collection's contents. Used for seeding only.
    pub fn replace(&self, collection: Collection, docs: Vec<Record>) {
        if let Ok(mut collections) = self.collections.write() {
            collections.insert(collection, Arc::new(docs));
        }
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: Collection) -> usize {
        self.snapshot(collection).map(|d| d.len()).unwrap_or(0)
    }

    fn snapshot(&self, collection: Collection) -> Result<Arc<Vec<Record>>, QueryError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| QueryError::ExecutionFailed {
                reason: "document store lock poisoned".to_string(),
            })?;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    fn select(
        &self,
        collection: Collection,
        filter: &Map<String, Value>,
        projection: Option<&Map<String, Value>>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, QueryError> {
        let docs = self.snapshot(collection)?;
        let mut out = Vec::new();
        for doc in docs.iter() {
            if limit.is_some_and(|n| out.len() >= n) {
                break;
            }
            if matches(doc, filter)? {
                out.push(match projection {
                    Some(spec) => project(doc, spec, false)?,
                    None => doc.clone(),
                });
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(
        &self,
        collection: Collection,
        filter: &Map<String, Value>,
        projection: Option<&Map<String, Value>>,
    ) -> FinqueryResult<Vec<Record>> {
        Ok(self.select(collection, filter, projection, None)?)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Map<String, Value>,
        projection: Option<&Map<String, Value>>,
    ) -> FinqueryResult<Option<Record>> {
        Ok(self
            .select(collection, filter, projection, Some(1))?
            .into_iter()
            .next())
    }

    async fn aggregate(
        &self,
        collection: Collection,
        pipeline: &[Value],
    ) -> FinqueryResult<Vec<Record>> {
        let docs = self.snapshot(collection)?;
        Ok(pipeline::run(docs.as_ref().clone(), pipeline)?)
    }

    async fn ping(&self) -> FinqueryResult<()> {
        self.snapshot(Collection::Users)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
