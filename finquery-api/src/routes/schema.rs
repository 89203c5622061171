//! Schema descriptor route.

use axum::Json;
use finquery_core::schema;

use crate::{state::AppState, types::SchemaResponse};

/// GET /api/schema - The four queryable collections and their fields
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/schema",
    tag = "Schema",
    responses(
        (status = 200, description = "Collection schemas", body = SchemaResponse),
    ),
))]
pub async fn get_schema() -> Json<SchemaResponse> {
    Json(SchemaResponse {
        collections: schema::collections().to_vec(),
        description: schema::describe(),
    })
}

/// Create the schema router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new().route("/", axum::routing::get(get_schema))
}
