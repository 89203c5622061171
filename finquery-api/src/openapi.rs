//! OpenAPI Specification for the FINQUERY API
//!
//! Generated with utoipa from the route annotations and schema derives.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use finquery_core::{StructuredQuery, TenantContext, TenantId, TenantInfo};

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{
    CacheHealth, ComponentHealth, HealthDetails, HealthResponse, HealthStatus,
};
use crate::routes::{cache, health, query, schema, tenants};
use crate::types::{
    InvalidateCacheResponse, ListTenantsResponse, QueryRequest, QueryResponse, SchemaResponse,
};

/// OpenAPI document for the FINQUERY API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "FINQUERY API",
        description = "Natural-language questions over per-tenant financial records",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Query", description = "Question answering"),
        (name = "Tenants", description = "Selectable tenants"),
        (name = "Schema", description = "Queryable collections"),
        (name = "Cache", description = "Response cache administration"),
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        query::process_query,
        tenants::list_tenants,
        schema::get_schema,
        cache::invalidate_cache,
        health::ping,
        health::liveness,
        health::readiness,
        crate::telemetry::metrics::metrics_handler,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        QueryRequest,
        QueryResponse,
        ListTenantsResponse,
        SchemaResponse,
        InvalidateCacheResponse,
        StructuredQuery,
        TenantContext,
        TenantId,
        TenantInfo,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
        CacheHealth,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the admin token scheme used by `DELETE /api/cache`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    cache::ADMIN_TOKEN_HEADER,
                ))),
            );
        }
    }
}

impl ApiDoc {
    /// Render the document as pretty JSON.
    pub fn to_pretty_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
