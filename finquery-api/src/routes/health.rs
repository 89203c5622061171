//! Health Check Endpoints
//!
//! Kubernetes-compatible health checks:
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Document store and cache check
//!
//! The cache is optional: an unreachable cache degrades readiness but does
//! not fail it, since the pipeline keeps answering without it.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    pub document_store: ComponentHealth,
    /// Absent when caching is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheHealth>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheHealth {
    pub status: HealthStatus,
    pub backend: String,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub writes: u64,
    pub hit_rate: f64,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is responding", body = String),
    ),
))]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
))]
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready (possibly degraded)", body = HealthResponse),
        (status = 503, description = "Service is not ready", body = HealthResponse),
    ),
))]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.orchestrator.executor().store();
    let limit = state.orchestrator.config().store_timeout;
    let started = Instant::now();
    let document_store = match tokio::time::timeout(limit, store.ping()).await {
        Ok(Ok(())) => ComponentHealth {
            status: HealthStatus::Healthy,
            latency_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Ok(Err(e)) => ComponentHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(format!("Document store check failed: {}", e)),
        },
        Err(_) => ComponentHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(format!("Document store did not answer within {}ms", limit.as_millis())),
        },
    };

    let cache = match state.orchestrator.cache() {
        Some(cache) => {
            let stats = cache.stats();
            let status = if cache.is_available().await {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            };
            Some(CacheHealth {
                status,
                backend: cache.backend_name().to_string(),
                hits: stats.hits,
                misses: stats.misses,
                errors: stats.errors,
                writes: stats.writes,
                hit_rate: stats.hit_rate(),
            })
        }
        None => None,
    };

    let overall_status = overall(&document_store, cache.as_ref());
    let response = HealthResponse {
        status: overall_status,
        message: None,
        details: Some(HealthDetails {
            document_store,
            cache,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if overall_status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

fn overall(store: &ComponentHealth, cache: Option<&CacheHealth>) -> HealthStatus {
    if store.status != HealthStatus::Healthy {
        return HealthStatus::Unhealthy;
    }
    match cache {
        Some(c) if c.status != HealthStatus::Healthy => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
