//! FINQUERY API - HTTP Layer
//!
//! A thin axum shim over the query pipeline: JSON request parsing, error
//! mapping, per-tenant rate limiting, health checks, Prometheus metrics and
//! an OpenAPI document. All question handling lives in `finquery-pipeline`.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

pub use bootstrap::{build_orchestrator, build_state, ServiceConfig};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{rate_limit_middleware, RateLimitState};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;
