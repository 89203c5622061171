//! HTTP-level tests of the router against fixture data.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use finquery_api::telemetry::MetricsObserver;
use finquery_api::{create_api_router, ApiConfig, AppState};
use finquery_core::{FinqueryConfig, FinqueryError, LlmError};
use finquery_pipeline::QueryOrchestrator;
use finquery_storage::{InMemoryCacheStore, ResponseCache};
use finquery_test_utils::{fixtures, ScriptedSynthesizer, ScriptedTranslator};
use serde_json::{json, Value};
use tower::ServiceExt;

const FOOD_QUESTION: &str = "How much did I spend on food?";
const ADMIN_TOKEN: &str = "s3cret";

struct TestApp {
    router: Router,
    translator: Arc<ScriptedTranslator>,
}

fn app_with(translator: ScriptedTranslator, config: ApiConfig) -> TestApp {
    let translator = Arc::new(translator);
    let cache = ResponseCache::new(
        Arc::new(InMemoryCacheStore::new()),
        Duration::from_secs(3600),
        Duration::from_secs(1),
    );
    let orchestrator = QueryOrchestrator::new(
        translator.clone(),
        Arc::new(ScriptedSynthesizer::echoing()),
        Arc::new(fixtures::document_store()),
        Some(cache),
        FinqueryConfig::default(),
    )
    .with_observer(Arc::new(MetricsObserver));

    TestApp {
        router: create_api_router(AppState::new(orchestrator, config)),
        translator,
    }
}

fn food_app(config: ApiConfig) -> TestApp {
    app_with(
        ScriptedTranslator::from_fn(|tenant, _| fixtures::food_spend_query(tenant)),
        config,
    )
}

fn unlimited() -> ApiConfig {
    ApiConfig::default().without_rate_limit()
}

fn query_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn food_question_for_a() -> Value {
    json!({
        "question": FOOD_QUESTION,
        "tenantId": fixtures::TENANT_A,
        "tenantName": fixtures::TENANT_A_NAME,
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

// ============================================================================
// /api/query
// ============================================================================

#[tokio::test]
async fn test_query_returns_tenant_scoped_total() {
    let app = food_app(unlimited());
    let (status, body) = send(&app.router, query_request(food_question_for_a())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["retrievedData"], json!([{ "_id": null, "total": fixtures::TENANT_A_FOOD_TOTAL }]));
    assert_eq!(body["fromCache"], false);
    assert_eq!(body["tenant"]["tenantId"], fixtures::TENANT_A);
    assert!(body["processing_time_ms"].is_u64());
    assert!(body["answer"].as_str().unwrap().contains("4300"));
    assert!(!body["answer"].as_str().unwrap().contains("9999"));
}

#[tokio::test]
async fn test_repeat_query_is_served_from_cache() {
    let app = food_app(unlimited());
    let (_, first) = send(&app.router, query_request(food_question_for_a())).await;
    let (status, second) = send(
        &app.router,
        query_request(json!({
            "question": "  how much did I spend on FOOD?  ",
            "tenantId": fixtures::TENANT_A,
            "tenantName": fixtures::TENANT_A_NAME,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["fromCache"], true);
    assert_eq!(second["answer"], first["answer"]);
    assert_eq!(app.translator.calls(), 1);
}

#[tokio::test]
async fn test_cached_answer_never_crosses_tenants() {
    let app = food_app(unlimited());
    send(&app.router, query_request(food_question_for_a())).await;
    let (status, body) = send(
        &app.router,
        query_request(json!({
            "question": FOOD_QUESTION,
            "tenantId": fixtures::TENANT_B,
            "tenantName": fixtures::TENANT_B_NAME,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fromCache"], false);
    assert_eq!(body["retrievedData"], json!([{ "_id": null, "total": 9999 }]));
    assert_eq!(app.translator.calls(), 2);
}

#[tokio::test]
async fn test_overlong_question_is_rejected_before_translation() {
    let app = food_app(unlimited());
    let (status, body) = send(
        &app.router,
        query_request(json!({
            "question": "a".repeat(501),
            "tenantId": fixtures::TENANT_A,
            "tenantName": fixtures::TENANT_A_NAME,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert!(body["message"].as_str().unwrap().contains("501"));
    assert!(body["processing_time_ms"].is_u64());
    assert_eq!(app.translator.calls(), 0);
}

#[tokio::test]
async fn test_missing_tenant_is_a_validation_error() {
    let app = food_app(unlimited());
    let (status, body) = send(
        &app.router,
        query_request(json!({ "question": FOOD_QUESTION, "tenantId": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert!(body["processing_time_ms"].is_u64());
    assert_eq!(app.translator.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_invalid_input() {
    let app = food_app(unlimited());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"question\": "))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
    assert!(body["processing_time_ms"].is_u64());
}

#[tokio::test]
async fn test_translation_failure_is_generic() {
    let app = app_with(
        ScriptedTranslator::failing(FinqueryError::from(LlmError::ProviderNotConfigured)),
        unlimited(),
    );
    let (status, body) = send(&app.router, query_request(food_question_for_a())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert_eq!(body["message"], "Failed to process your question. Please try again.");
    assert!(body["processing_time_ms"].is_u64());
}

#[tokio::test]
async fn test_unparseable_translation_is_generic() {
    let app = app_with(ScriptedTranslator::raw("I think you should look at food"), unlimited());
    let (status, body) = send(&app.router, query_request(food_question_for_a())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.to_string().contains("look at food"));
}

// ============================================================================
// /api/tenants and /api/schema
// ============================================================================

#[tokio::test]
async fn test_list_tenants() {
    let app = food_app(unlimited());
    let (status, body) = send(&app.router, get("/api/tenants")).await;

    assert_eq!(status, StatusCode::OK);
    let tenants = body["tenants"].as_array().unwrap();
    assert_eq!(tenants.len(), 2);
    assert!(tenants.contains(&json!({ "id": fixtures::TENANT_A, "name": fixtures::TENANT_A_NAME })));
}

#[tokio::test]
async fn test_schema_lists_collections() {
    let app = food_app(unlimited());
    let (status, body) = send(&app.router, get("/api/schema")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["collections"].as_array().unwrap().is_empty());
    assert!(body["description"].as_str().unwrap().contains("bank_transactions"));
}

// ============================================================================
// /api/cache
// ============================================================================

fn invalidate(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::DELETE).uri(uri);
    if let Some(token) = token {
        builder = builder.header("x-admin-token", token);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_cache_admin_disabled_without_token() {
    let app = food_app(unlimited());
    let (status, body) = send(&app.router, invalidate("/api/cache", Some("anything"))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_cache_admin_rejects_wrong_token() {
    let app = food_app(unlimited().with_admin_token(ADMIN_TOKEN));
    let (status, _) = send(&app.router, invalidate("/api/cache", Some("guess"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.router, invalidate("/api/cache", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tenant_invalidation_forces_recompute() {
    let app = food_app(unlimited().with_admin_token(ADMIN_TOKEN));
    send(&app.router, query_request(food_question_for_a())).await;

    let uri = format!("/api/cache?tenant_id={}", fixtures::TENANT_A);
    let (status, body) = send(&app.router, invalidate(&uri, Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);
    assert_eq!(body["tenant_id"], fixtures::TENANT_A);

    let (_, again) = send(&app.router, query_request(food_question_for_a())).await;
    assert_eq!(again["fromCache"], false);
    assert_eq!(app.translator.calls(), 2);
}

#[tokio::test]
async fn test_full_invalidation_removes_every_tenant() {
    let app = food_app(unlimited().with_admin_token(ADMIN_TOKEN));
    send(&app.router, query_request(food_question_for_a())).await;
    send(
        &app.router,
        query_request(json!({
            "question": FOOD_QUESTION,
            "tenantId": fixtures::TENANT_B,
            "tenantName": fixtures::TENANT_B_NAME,
        })),
    )
    .await;

    let (status, body) = send(&app.router, invalidate("/api/cache", Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 2);
    assert!(body.get("tenant_id").is_none());
}

// ============================================================================
// HEALTH, METRICS, OPENAPI
// ============================================================================

#[tokio::test]
async fn test_readiness_reports_store_and_cache() {
    let app = food_app(unlimited());
    send(&app.router, query_request(food_question_for_a())).await;
    send(&app.router, query_request(food_question_for_a())).await;

    let (status, body) = send(&app.router, get("/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["document_store"]["status"], "healthy");

    let cache = &body["details"]["cache"];
    assert_eq!(cache["status"], "healthy");
    assert_eq!(cache["hits"], 1);
    assert_eq!(cache["misses"], 1);
    assert_eq!(cache["writes"], 1);
}

#[tokio::test]
async fn test_liveness_and_ping() {
    let app = food_app(unlimited());
    let (status, body) = send(&app.router, get("/health/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("pong".into()));

    let (status, body) = send(&app.router, get("/health/live")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_exposes_request_counters() {
    let app = food_app(unlimited());
    send(&app.router, query_request(food_question_for_a())).await;

    let (status, body) = send(&app.router, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("finquery_http_requests_total"));
    assert!(text.contains("/api/query"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = food_app(unlimited());
    let (status, body) = send(&app.router, get("/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/query"].is_object());
    assert!(body["paths"]["/api/cache"]["delete"].is_object());
}

// ============================================================================
// RATE LIMITING
// ============================================================================

#[tokio::test]
async fn test_rate_limit_applies_per_tenant() {
    let app = food_app(ApiConfig::default().with_rate_limit(1, 1));
    let (first, _) = send(&app.router, query_request(food_question_for_a())).await;
    assert_eq!(first, StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(query_request(food_question_for_a()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    let (other, _) = send(
        &app.router,
        query_request(json!({
            "question": FOOD_QUESTION,
            "tenantId": fixtures::TENANT_B,
            "tenantName": fixtures::TENANT_B_NAME,
        })),
    )
    .await;
    assert_eq!(other, StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let app = food_app(ApiConfig::default().with_rate_limit(1, 1));
    for _ in 0..3 {
        let (status, _) = send(&app.router, get("/health/live")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
