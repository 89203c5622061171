//! FINQUERY API Server Entry Point
//!
//! Loads configuration, wires the pipeline and starts the Axum HTTP server.

use std::net::SocketAddr;

use axum::Router;
use finquery_api::telemetry::{init_tracing, TelemetryConfig};
use finquery_api::{build_state, create_api_router, ApiError, ApiResult, ServiceConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let config = ServiceConfig::from_env()?;
    let addr = config.api.bind_addr()?;
    let state = build_state(&config)?;

    let app: Router = create_api_router(state);

    tracing::info!(%addr, "Starting FINQUERY API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
