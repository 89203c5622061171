//! REST API Routes Module
//!
//! - `/api/query`, `/api/tenants`, `/api/schema`, `/api/cache`
//! - `/health/*` checks
//! - `/metrics` for Prometheus
//! - `/openapi.json` when the `openapi` feature is enabled

pub mod cache;
pub mod health;
pub mod query;
pub mod schema;
pub mod tenants;

use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::middleware::{rate_limit_middleware, RateLimitState};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

/// Build the complete router.
///
/// # Middleware Order (outer to inner)
/// 1. CORS - handles preflight requests
/// 2. Observability - tracing and metrics
/// 3. Rate limiting - only on `/api/*`
pub fn create_api_router(state: AppState) -> Router {
    let rate_limit_state = RateLimitState::new(state.config.clone());

    let api_routes = Router::new()
        .nest("/query", query::create_router())
        .nest("/tenants", tenants::create_router())
        .nest("/schema", schema::create_router())
        .nest("/cache", cache::create_router())
        .layer(from_fn_with_state(rate_limit_state, rate_limit_middleware));

    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", get(openapi_json));
    }

    let cors = build_cors_layer(&state.config);

    router
        .layer(from_fn(observability_middleware))
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// With no configured origins every origin is allowed (development).
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-tenant-id"),
            HeaderName::from_static(cache::ADMIN_TOKEN_HEADER),
        ])
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            header::RETRY_AFTER,
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}
