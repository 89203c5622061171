//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use finquery_pipeline::QueryOrchestrator;

use crate::config::ApiConfig;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<QueryOrchestrator>,
    pub config: Arc<ApiConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: QueryOrchestrator, config: ApiConfig) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}

macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<AppState> for $type {
            fn from_ref(state: &AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}

impl_from_ref!(Arc<QueryOrchestrator>, orchestrator);
impl_from_ref!(Arc<ApiConfig>, config);
