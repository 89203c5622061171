//! Tenant listing route.

use std::sync::Arc;

use axum::{extract::State, Json};
use finquery_pipeline::QueryOrchestrator;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    types::ListTenantsResponse,
};

/// GET /api/tenants - List every tenant in the `users` collection
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/tenants",
    tag = "Tenants",
    responses(
        (status = 200, description = "List of tenants", body = ListTenantsResponse),
        (status = 500, description = "Document store failure", body = ApiError),
    ),
))]
pub async fn list_tenants(
    State(orchestrator): State<Arc<QueryOrchestrator>>,
) -> ApiResult<Json<ListTenantsResponse>> {
    let tenants = orchestrator.list_tenants().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list tenants");
        ApiError::internal_error("Failed to list tenants")
    })?;
    Ok(Json(ListTenantsResponse { tenants }))
}

/// Create the tenant routes router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new().route("/", axum::routing::get(list_tenants))
}
