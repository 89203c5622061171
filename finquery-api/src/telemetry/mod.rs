//! FINQUERY Telemetry - Observability Infrastructure
//!
//! Structured logging through `tracing` and Prometheus metrics for the API
//! layer and the query pipeline.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, FinqueryMetrics, MetricsObserver, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, TelemetryConfig};
