//! Tracing subscriber initialization.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Environment (production, staging, development)
    pub environment: String,
    /// Emit JSON lines instead of human-readable output
    pub log_json: bool,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: std::env::var("FINQUERY_SERVICE_NAME")
                .unwrap_or_else(|_| "finquery-api".to_string()),
            environment: std::env::var("FINQUERY_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_json: std::env::var("FINQUERY_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(true),
            default_filter: "finquery_api=debug,finquery_pipeline=info,tower_http=info,info"
                .to_string(),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. `RUST_LOG` overrides the default filter.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.log_json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.environment,
        "Telemetry initialized"
    );
    Ok(())
}
