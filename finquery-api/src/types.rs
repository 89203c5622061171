//! Request and response bodies.

use finquery_core::{CollectionSchema, QueryResult, TenantContext, TenantInfo};
use serde::{Deserialize, Serialize};

// ============================================================================
// QUERY
// ============================================================================

/// Body of `POST /api/query`.
///
/// Missing fields deserialize as empty strings so they are reported by
/// pipeline validation rather than rejected by the JSON extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QueryRequest {
    /// Natural-language question, 1 to 500 characters.
    #[serde(default)]
    pub question: String,

    #[serde(default, alias = "tenantId", alias = "userId")]
    pub tenant_id: String,

    /// Display name used in the answer.
    #[serde(default, alias = "tenantName", alias = "userName")]
    pub tenant_name: String,
}

impl QueryRequest {
    pub fn tenant(&self) -> TenantContext {
        TenantContext::new(self.tenant_id.trim(), self.tenant_name.trim())
    }
}

/// Body of a successful `POST /api/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QueryResponse {
    #[serde(flatten)]
    pub result: QueryResult,
    pub processing_time_ms: u64,
}

// ============================================================================
// TENANTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListTenantsResponse {
    pub tenants: Vec<TenantInfo>,
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Body of `GET /api/schema`.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SchemaResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Object>))]
    pub collections: Vec<CollectionSchema>,
    /// The rendered description handed to the translation collaborator.
    pub description: String,
}

// ============================================================================
// CACHE
// ============================================================================

/// Query string of `DELETE /api/cache`.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct InvalidateCacheParams {
    /// Only drop entries of this tenant. Omit to drop every entry.
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct InvalidateCacheResponse {
    /// Number of entries removed.
    pub removed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_accepts_camel_case() {
        let req: QueryRequest = serde_json::from_value(json!({
            "question": "How much did I spend on food?",
            "tenantId": "tenant_a",
            "tenantName": "Asha"
        }))
        .unwrap();
        assert_eq!(req.tenant_id, "tenant_a");
        assert_eq!(req.tenant().tenant_name, "Asha");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let req: QueryRequest = serde_json::from_value(json!({ "question": "hi" })).unwrap();
        assert!(req.tenant().tenant_id.is_blank());
        assert!(req.tenant_name.is_empty());
    }
}
