//! Query executor.
//!
//! Resolves the collection and operation of an [`IsolatedQuery`] against
//! the allow-lists and runs it on the document store. Filter and pipeline
//! contents are passed through as-is. Read-only.

use std::sync::Arc;
use std::time::{Duration, Instant};

use finquery_core::{Collection, FinqueryError, FinqueryResult, Operation, Record};
use finquery_storage::DocumentStore;
use serde_json::Map;
use tracing::debug;

use crate::guard::IsolatedQuery;

/// Executes isolated queries with a bound on each store call.
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Run `query` and return the matching rows.
    ///
    /// # Errors
    /// - `QueryError::InvalidCollection` for a collection outside the four
    /// - `QueryError::UnsupportedOperation` for anything but find, find_one
    ///   and aggregate
    /// - `QueryError::ExecutionFailed` when the store rejects the query
    /// - `FinqueryError::Timeout` when the store does not answer in time
    pub async fn execute(&self, query: &IsolatedQuery) -> FinqueryResult<Vec<Record>> {
        let query = query.as_query();
        let collection = query.collection_kind()?;
        let operation = query.operation_kind()?;

        let started = Instant::now();
        let empty = Map::new();
        let filter = query.filter.as_ref().unwrap_or(&empty);
        let projection = query.projection.as_ref();

        let rows = match operation {
            Operation::Find => {
                self.bounded(self.store.find(collection, filter, projection))
                    .await?
            }
            Operation::FindOne => self
                .bounded(self.store.find_one(collection, filter, projection))
                .await?
                .into_iter()
                .collect(),
            Operation::Aggregate => {
                let pipeline = query.pipeline.as_deref().unwrap_or(&[]);
                self.bounded(self.store.aggregate(collection, pipeline)).await?
            }
        };

        debug!(
            collection = %collection,
            operation = %operation,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Executed query"
        );
        Ok(rows)
    }

    /// Every document of the `users` collection, unfiltered.
    pub async fn list_users(&self) -> FinqueryResult<Vec<Record>> {
        self.bounded(self.store.find(Collection::Users, &Map::new(), None))
            .await
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = FinqueryResult<T>>,
    ) -> FinqueryResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| FinqueryError::timeout("execute", self.timeout))?
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("store", &self.store.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::enforce;
    use finquery_core::{QueryError, StructuredQuery, TenantId};
    use finquery_test_utils::{assertions, fixtures, CountingDocumentStore};
    use serde_json::json;

    fn executor() -> QueryExecutor {
        QueryExecutor::new(Arc::new(fixtures::document_store()), Duration::from_secs(5))
    }

    fn tenant_a() -> TenantId {
        TenantId::new(fixtures::TENANT_A)
    }

    #[tokio::test]
    async fn test_unknown_collection_rejected() {
        let mut query = StructuredQuery::find(Collection::BankTransactions, Map::new());
        query.collection = "accounts".to_string();
        let result = executor().execute(&enforce(query, &tenant_a())).await;
        assertions::assert_invalid_collection(&result);
    }

    #[tokio::test]
    async fn test_unknown_operation_rejected() {
        let mut query = StructuredQuery::find(Collection::BankTransactions, Map::new());
        query.operation = "delete_many".to_string();
        let err = executor()
            .execute(&enforce(query, &tenant_a()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FinqueryError::Query(QueryError::UnsupportedOperation { operation }) if operation == "delete_many"
        ));
    }

    #[tokio::test]
    async fn test_find_one_returns_at_most_one_row() {
        let query = StructuredQuery::find_one(Collection::BankTransactions, Map::new());
        let rows = executor().execute(&enforce(query, &tenant_a())).await.unwrap();
        assert_eq!(rows.len(), 1);
        assertions::assert_rows_scoped_to(&rows, &tenant_a());

        let query = StructuredQuery::find_one(Collection::BankTransactions, Map::new());
        let rows = executor()
            .execute(&enforce(query, &TenantId::new("nobody")))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_food_total_for_tenant() {
        let query = fixtures::food_spend_query(&tenant_a());
        let rows = executor().execute(&enforce(query, &tenant_a())).await.unwrap();
        assert_eq!(rows, vec![json!({ "_id": null, "total": fixtures::TENANT_A_FOOD_TOTAL })]);
    }

    #[tokio::test]
    async fn test_projection_applied() {
        let mut projection = Map::new();
        projection.insert("amount".to_string(), json!(1));
        let query = StructuredQuery::find(Collection::BankTransactions, Map::new())
            .with_projection(projection);
        let rows = executor().execute(&enforce(query, &tenant_a())).await.unwrap();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.get("merchant").is_none() && r.get("amount").is_some()));
    }

    #[tokio::test]
    async fn test_list_users_is_unfiltered() {
        let users = executor().list_users().await.unwrap();
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn test_execution_does_not_mutate_store() {
        let store = Arc::new(fixtures::document_store());
        let executor = QueryExecutor::new(store.clone(), Duration::from_secs(5));
        let before = store.count(Collection::BankTransactions);

        let query = StructuredQuery::aggregate(
            Collection::BankTransactions,
            vec![
                json!({ "$set": { "amount": 0 } }),
                json!({ "$unwind": "$missing" }),
            ],
        );
        executor.execute(&enforce(query, &tenant_a())).await.unwrap();

        let rows = executor
            .execute(&enforce(
                StructuredQuery::find(Collection::BankTransactions, Map::new()),
                &tenant_a(),
            ))
            .await
            .unwrap();
        assert_eq!(store.count(Collection::BankTransactions), before);
        assert!(rows.iter().all(|r| r["amount"].as_i64().unwrap_or(0) > 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_times_out() {
        let store = Arc::new(CountingDocumentStore::stalled(Arc::new(fixtures::document_store())));
        let executor = QueryExecutor::new(store.clone(), Duration::from_millis(50));
        let query = enforce(fixtures::food_spend_query(&tenant_a()), &tenant_a());
        let result = executor.execute(&query).await;
        assertions::assert_timeout(&result, "execute");
        assert_eq!(store.aggregates(), 1);
    }
}
