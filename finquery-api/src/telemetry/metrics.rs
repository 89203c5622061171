//! Prometheus Metrics Definitions
//!
//! HTTP request metrics plus the pipeline checkpoints reported through
//! [`MetricsObserver`]. Exposed on `/metrics` for scraping.

use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse};
use finquery_core::FinqueryError;
use finquery_pipeline::{CacheLookup, PipelineObserver, QueryOutcome, Stage};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Pipeline stage latency buckets (seconds). Translation and synthesis
/// calls to a hosted model dominate the upper range.
const STAGE_LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<FinqueryMetrics>> = Lazy::new(FinqueryMetrics::new);

/// Container for all FINQUERY metrics.
#[derive(Clone)]
pub struct FinqueryMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Finished questions - labels: outcome
    pub queries_total: CounterVec,

    /// Response cache lookups - labels: result
    pub cache_lookups_total: CounterVec,

    /// Pipeline stage duration histogram - labels: stage
    pub stage_duration_seconds: HistogramVec,
}

impl FinqueryMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "finquery_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "finquery_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            queries_total: register_counter_vec!(
                "finquery_queries_total",
                "Questions processed, by outcome",
                &["outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register queries_total: {}", e)))?,

            cache_lookups_total: register_counter_vec!(
                "finquery_cache_lookups_total",
                "Response cache lookups, by result",
                &["result"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_lookups_total: {}", e)))?,

            stage_duration_seconds: register_histogram_vec!(
                "finquery_stage_duration_seconds",
                "Pipeline stage duration in seconds",
                &["stage"],
                STAGE_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register stage_duration_seconds: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }
}

/// Run `f` against the global metrics, skipping silently if registration
/// failed at startup (already logged once by [`log_registration_failure`]).
pub fn with_metrics(f: impl FnOnce(&FinqueryMetrics)) {
    if let Ok(metrics) = METRICS.as_ref() {
        f(metrics);
    }
}

/// Force registration and log if it failed.
pub fn log_registration_failure() {
    if let Err(e) = METRICS.as_ref() {
        tracing::error!(error = %e, "Prometheus metrics unavailable");
    }
}

/// Feeds pipeline checkpoints into Prometheus.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl PipelineObserver for MetricsObserver {
    fn on_stage(&self, stage: Stage, elapsed: Duration, _outcome: Result<(), &FinqueryError>) {
        with_metrics(|m| {
            m.stage_duration_seconds
                .with_label_values(&[stage.as_str()])
                .observe(elapsed.as_secs_f64())
        });
    }

    fn on_cache(&self, lookup: CacheLookup) {
        with_metrics(|m| m.cache_lookups_total.with_label_values(&[lookup.as_str()]).inc());
    }

    fn on_query(&self, outcome: QueryOutcome, _elapsed: Duration) {
        with_metrics(|m| m.queries_total.with_label_values(&[outcome.as_str()]).inc());
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> Result<&'static FinqueryMetrics, String> {
        METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))
    }

    #[test]
    fn test_record_http_request() -> Result<(), String> {
        let m = metrics()?;
        let before = m
            .http_requests_total
            .with_label_values(&["GET", "/health/ping", "200"])
            .get();
        m.record_http_request("GET", "/health/ping", 200, 0.002);
        let after = m
            .http_requests_total
            .with_label_values(&["GET", "/health/ping", "200"])
            .get();
        assert_eq!(after - before, 1.0);
        Ok(())
    }

    #[test]
    fn test_observer_counts_outcomes_and_lookups() -> Result<(), String> {
        let m = metrics()?;
        let cached = || m.queries_total.with_label_values(&["cached"]).get();
        let hits = || m.cache_lookups_total.with_label_values(&["hit"]).get();
        let (cached_before, hits_before) = (cached(), hits());

        MetricsObserver.on_cache(CacheLookup::Hit);
        MetricsObserver.on_query(QueryOutcome::Cached, Duration::from_millis(3));
        MetricsObserver.on_stage(Stage::Translate, Duration::from_millis(40), Ok(()));

        assert!(cached() - cached_before >= 1.0);
        assert!(hits() - hits_before >= 1.0);
        assert!(
            m.stage_duration_seconds
                .with_label_values(&["translate"])
                .get_sample_count()
                >= 1
        );
        Ok(())
    }
}
