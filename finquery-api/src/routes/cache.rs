//! Response cache administration.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use finquery_core::TenantId;
use finquery_storage::cache::KEY_PREFIX;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    types::{InvalidateCacheParams, InvalidateCacheResponse},
};

/// Header carrying the admin token.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

fn require_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return Err(ApiError::forbidden("Cache administration is disabled"));
    };
    match headers.get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        Some(given) if given == expected => Ok(()),
        _ => Err(ApiError::unauthorized("Missing or invalid admin token")),
    }
}

/// DELETE /api/cache - Drop cached answers, for one tenant or all
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/api/cache",
    tag = "Cache",
    params(InvalidateCacheParams),
    responses(
        (status = 200, description = "Entries removed", body = InvalidateCacheResponse),
        (status = 401, description = "Missing or wrong admin token", body = ApiError),
        (status = 403, description = "Cache administration disabled", body = ApiError),
    ),
    security(("admin_token" = []))
))]
pub async fn invalidate_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<InvalidateCacheParams>,
) -> ApiResult<Json<InvalidateCacheResponse>> {
    require_admin(&state, &headers)?;

    let tenant_id = params
        .tenant_id
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    // No cache configured: nothing to remove.
    let removed = match state.orchestrator.cache() {
        Some(cache) => match &tenant_id {
            Some(tenant) => cache.invalidate_tenant(&TenantId::new(tenant.as_str())).await,
            None => cache.invalidate(&format!("{}:*", KEY_PREFIX)).await,
        },
        None => 0,
    };

    tracing::info!(removed, tenant_id = ?tenant_id, "Response cache invalidated");
    Ok(Json(InvalidateCacheResponse { removed, tenant_id }))
}

/// Create the cache administration router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new().route("/", axum::routing::delete(invalidate_cache))
}
