//! Query orchestrator.
//!
//! One request runs:
//!
//! ```text
//! START -> CACHE_LOOKUP -> HIT: DONE
//!                       -> MISS: TRANSLATE -> ISOLATE -> EXECUTE
//!                                -> SYNTHESIZE -> CACHE_STORE -> DONE
//! ```
//!
//! Input is validated before any external call. A failure in translate,
//! execute or synthesize aborts the request; nothing is retried. Cache
//! failures never abort (the [`ResponseCache`] fails open). Each external
//! call is bounded by the timeout configured for it.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use finquery_core::{
    schema, validate_question, validate_tenant, FinqueryConfig, FinqueryError, FinqueryResult,
    QueryResult, Record, TenantContext, TenantInfo,
};
use finquery_llm::{AnswerSynthesizer, QueryTranslator};
use finquery_storage::{DocumentStore, ResponseCache};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::executor::QueryExecutor;
use crate::guard::enforce;
use crate::observer::{CacheLookup, ObserverChain, PipelineObserver, QueryOutcome, Stage, TracingObserver};

/// Coordinates the cache, the two collaborators and the executor.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct QueryOrchestrator {
    translator: Arc<dyn QueryTranslator>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    executor: QueryExecutor,
    cache: Option<ResponseCache>,
    config: FinqueryConfig,
    schema: String,
    observers: ObserverChain,
}

impl QueryOrchestrator {
    /// Build an orchestrator. `cache: None` runs without a response cache.
    pub fn new(
        translator: Arc<dyn QueryTranslator>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        store: Arc<dyn DocumentStore>,
        cache: Option<ResponseCache>,
        config: FinqueryConfig,
    ) -> Self {
        let mut observers = ObserverChain::default();
        observers.add(Arc::new(TracingObserver));
        Self {
            translator,
            synthesizer,
            executor: QueryExecutor::new(store, config.store_timeout),
            cache,
            config,
            schema: schema::describe(),
            observers,
        }
    }

    /// Register an additional checkpoint observer.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn config(&self) -> &FinqueryConfig {
        &self.config
    }

    /// Answer `question` for `tenant`.
    ///
    /// # Errors
    /// - `FinqueryError::Validation` for an empty or over-long question or a
    ///   missing tenant id/name; no external call has been made
    /// - any translate, execute or synthesize failure, including timeouts
    #[instrument(skip(self, question, tenant), fields(tenant_id = %tenant.tenant_id))]
    pub async fn process_query(
        &self,
        question: &str,
        tenant: &TenantContext,
    ) -> FinqueryResult<QueryResult> {
        let started = Instant::now();

        if let Err(e) = self.validate(question, tenant) {
            self.observers.on_query(QueryOutcome::Rejected, started.elapsed());
            return Err(e);
        }

        match self.run(question, tenant).await {
            Ok(result) => {
                let outcome = if result.from_cache {
                    QueryOutcome::Cached
                } else {
                    QueryOutcome::Answered
                };
                self.observers.on_query(outcome, started.elapsed());
                Ok(result)
            }
            Err(e) => {
                error!(
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Query failed"
                );
                self.observers.on_query(QueryOutcome::Failed, started.elapsed());
                Err(e)
            }
        }
    }

    /// Every tenant in the `users` collection.
    pub async fn list_tenants(&self) -> FinqueryResult<Vec<TenantInfo>> {
        let users = self.executor.list_users().await?;
        Ok(users.iter().filter_map(tenant_info).collect())
    }

    fn validate(&self, question: &str, tenant: &TenantContext) -> FinqueryResult<()> {
        validate_tenant(tenant)?;
        validate_question(question, self.config.max_question_len)?;
        Ok(())
    }

    async fn run(&self, question: &str, tenant: &TenantContext) -> FinqueryResult<QueryResult> {
        let tenant_id = &tenant.tenant_id;
        let key = self.cache.as_ref().map(|c| c.key(tenant_id, question));

        // CACHE_LOOKUP
        match (&self.cache, &key) {
            (Some(cache), Some(key)) => {
                let lookup_started = Instant::now();
                let hit = cache.get(key).await;
                self.observers
                    .on_stage(Stage::CacheLookup, lookup_started.elapsed(), Ok(()));
                if let Some(hit) = hit {
                    self.observers.on_cache(CacheLookup::Hit);
                    debug!(key = %key, "Serving cached answer");
                    return Ok(hit.into_cached());
                }
                self.observers.on_cache(CacheLookup::Miss);
            }
            _ => self.observers.on_cache(CacheLookup::Bypassed),
        }

        // TRANSLATE
        let translated = self
            .stage(
                Stage::Translate,
                Some(self.config.llm_timeout),
                self.translator.translate(&self.schema, tenant_id, question),
            )
            .await?;

        // ISOLATE
        let isolate_started = Instant::now();
        let isolated = enforce(translated, tenant_id);
        self.observers
            .on_stage(Stage::Isolate, isolate_started.elapsed(), Ok(()));

        // EXECUTE (bounded inside the executor)
        let rows: Vec<Record> = self
            .stage(Stage::Execute, None, self.executor.execute(&isolated))
            .await?;

        // SYNTHESIZE
        let answer = self
            .stage(
                Stage::Synthesize,
                Some(self.config.llm_timeout),
                self.synthesizer
                    .synthesize(&tenant.tenant_name, question, &rows),
            )
            .await?;

        let result = QueryResult::new(question, tenant.clone(), answer, isolated.into_inner(), rows);

        // CACHE_STORE
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            let store_started = Instant::now();
            cache.put(key, &result).await;
            self.observers
                .on_stage(Stage::CacheStore, store_started.elapsed(), Ok(()));
        }

        Ok(result)
    }

    /// Run one stage, bounded by `limit` when given, and report it.
    async fn stage<T, F>(&self, stage: Stage, limit: Option<Duration>, fut: F) -> FinqueryResult<T>
    where
        F: Future<Output = FinqueryResult<T>>,
    {
        let started = Instant::now();
        let result = match limit {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or_else(|_| Err(FinqueryError::timeout(stage.as_str(), limit))),
            None => fut.await,
        };
        self.observers
            .on_stage(stage, started.elapsed(), result.as_ref().map(|_| ()));
        result
    }
}

fn tenant_info(user: &Record) -> Option<TenantInfo> {
    let id = user.get("id").and_then(Value::as_str)?;
    let name = user.get("name").and_then(Value::as_str).unwrap_or(id);
    Some(TenantInfo {
        id: id.to_string(),
        name: name.to_string(),
    })
}

impl std::fmt::Debug for QueryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOrchestrator")
            .field("executor", &self.executor)
            .field("cache", &self.cache.as_ref().map(|c| c.backend_name()))
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finquery_test_utils::{fixtures, ScriptedSynthesizer, ScriptedTranslator};
    use serde_json::json;

    fn orchestrator(translator: ScriptedTranslator) -> QueryOrchestrator {
        QueryOrchestrator::new(
            Arc::new(translator),
            Arc::new(ScriptedSynthesizer::echoing()),
            Arc::new(fixtures::document_store()),
            None,
            FinqueryConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_executed_query_is_the_isolated_one() {
        let orch = orchestrator(ScriptedTranslator::returning(fixtures::unscoped_food_query()));
        let result = orch
            .process_query("What did I eat?", &fixtures::tenant_a())
            .await
            .unwrap();
        let filter = result.executed_query.filter.unwrap();
        assert_eq!(filter["tenantId"], json!(fixtures::TENANT_A));
        assert_eq!(result.retrieved_data.len(), 2);
        assert!(!result.from_cache);
    }

    #[tokio::test]
    async fn test_list_tenants() {
        let orch = orchestrator(ScriptedTranslator::returning(fixtures::unscoped_food_query()));
        let tenants = orch.list_tenants().await.unwrap();
        assert_eq!(
            tenants,
            vec![
                TenantInfo { id: fixtures::TENANT_A.into(), name: fixtures::TENANT_A_NAME.into() },
                TenantInfo { id: fixtures::TENANT_B.into(), name: fixtures::TENANT_B_NAME.into() },
            ]
        );
    }

    #[test]
    fn test_tenant_info_requires_id() {
        assert!(tenant_info(&json!({ "name": "x" })).is_none());
        assert_eq!(tenant_info(&json!({ "id": "u" })).unwrap().name, "u");
    }

    #[tokio::test]
    async fn test_blank_tenant_rejected() {
        let translator = Arc::new(ScriptedTranslator::returning(fixtures::unscoped_food_query()));
        let orch = QueryOrchestrator::new(
            translator.clone(),
            Arc::new(ScriptedSynthesizer::echoing()),
            Arc::new(fixtures::document_store()),
            None,
            FinqueryConfig::default(),
        );
        let result = orch
            .process_query("food?", &TenantContext::new("", "Nobody"))
            .await;
        finquery_test_utils::assertions::assert_validation_error(&result);
        assert_eq!(translator.calls(), 0);
    }
}
