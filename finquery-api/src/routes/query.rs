//! Question answering route.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    types::{QueryRequest, QueryResponse},
};

/// POST /api/query - Answer a question for one tenant
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/query",
    tag = "Query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Answer with the executed query and retrieved rows", body = QueryResponse),
        (status = 400, description = "Question or tenant failed validation", body = ApiError),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
        (status = 500, description = "The pipeline failed", body = ApiError),
        (status = 504, description = "A pipeline stage timed out", body = ApiError),
    ),
))]
pub async fn process_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<QueryResponse>> {
    let started = Instant::now();
    let elapsed_ms = || started.elapsed().as_millis() as u64;

    let Json(request) = body.map_err(|rejection| {
        ApiError::invalid_input(rejection.body_text()).with_processing_time(elapsed_ms())
    })?;

    let result = state
        .orchestrator
        .process_query(&request.question, &request.tenant())
        .await
        .map_err(|e| ApiError::from(e).with_processing_time(elapsed_ms()))?;

    Ok(Json(QueryResponse {
        result,
        processing_time_ms: elapsed_ms(),
    }))
}

/// Create the query router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new().route("/", axum::routing::post(process_query))
}
