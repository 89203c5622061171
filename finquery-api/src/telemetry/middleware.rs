//! Axum middleware for request spans and HTTP metrics.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::with_metrics;

/// Label for requests that matched no route. Keeps scanner traffic from
/// creating one Prometheus series per scanned URL.
const UNMATCHED_PATH: &str = "unmatched";

/// Route template for metrics and spans, e.g. `/api/query`.
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string())
}

/// Observability middleware for Axum.
///
/// Wraps every request in an `http_request` span, records Prometheus
/// request metrics and logs completion.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = route_label(&request);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %route,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();

    with_metrics(|m| {
        m.record_http_request(method.as_str(), &route, status.as_u16(), duration.as_secs_f64())
    });

    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_unrouted_request_gets_fixed_label() {
        let request = Request::builder()
            .uri("/wp-admin/setup.php")
            .body(Body::empty())
            .unwrap();
        assert_eq!(route_label(&request), UNMATCHED_PATH);
    }
}
