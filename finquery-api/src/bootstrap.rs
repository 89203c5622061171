//! Wiring the pipeline from configuration.

use std::sync::Arc;

use finquery_core::FinqueryConfig;
use finquery_llm::{LlmConfig, ProviderRegistry};
use finquery_pipeline::QueryOrchestrator;
use finquery_storage::{ResponseCache, StorageConfig};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::telemetry::MetricsObserver;

/// Every configuration section the server needs.
#[derive(Clone)]
pub struct ServiceConfig {
    pub api: ApiConfig,
    pub pipeline: FinqueryConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
}

impl ServiceConfig {
    /// Load all sections from `FINQUERY_*` environment variables.
    pub fn from_env() -> ApiResult<Self> {
        Ok(Self {
            api: ApiConfig::from_env()?,
            pipeline: FinqueryConfig::from_env()?,
            llm: LlmConfig::from_env()?,
            storage: StorageConfig::from_env()?,
        })
    }
}

/// Build the orchestrator: document store, optional response cache,
/// collaborators from the provider registry, and the metrics observer.
pub fn build_orchestrator(config: &ServiceConfig) -> ApiResult<QueryOrchestrator> {
    let store = config.storage.load_document_store().map_err(|e| {
        ApiError::service_unavailable(format!("Failed to load document store: {}", e))
    })?;

    let cache = config
        .storage
        .open_cache_store()
        .map_err(|e| ApiError::service_unavailable(format!("Failed to open cache store: {}", e)))?
        .map(|cache_store| {
            ResponseCache::new(
                cache_store,
                config.pipeline.cache_ttl,
                config.pipeline.cache_timeout,
            )
        });

    let providers = ProviderRegistry::from_config(&config.llm)
        .and_then(|registry| Ok((registry.translator()?, registry.synthesizer()?)))
        .map_err(|e| ApiError::internal_error(format!("Failed to configure LLM providers: {}", e)))?;
    let (translator, synthesizer) = providers;

    tracing::info!(
        cache_backend = ?config.storage.cache_backend,
        provider = config.llm.provider.as_str(),
        cache_ttl_secs = config.pipeline.cache_ttl.as_secs(),
        "Pipeline configured"
    );

    Ok(QueryOrchestrator::new(
        translator,
        synthesizer,
        Arc::new(store),
        cache,
        config.pipeline.clone(),
    )
    .with_observer(Arc::new(MetricsObserver)))
}

/// Build the shared router state.
pub fn build_state(config: &ServiceConfig) -> ApiResult<AppState> {
    crate::telemetry::metrics::log_registration_failure();
    Ok(AppState::new(build_orchestrator(config)?, config.api.clone()))
}
