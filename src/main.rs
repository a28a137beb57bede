use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};

use gobo::error::StorageOperation;
use gobo::telemetry::{self, LogConfig};
use gobo::{AppError, AppState, Config, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Fall back to default logging so the failure is still reported.
            let _ = telemetry::init_tracing(&LogConfig::default());
            error!("Configuration error: {e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    if let Err(e) = telemetry::init_tracing(&LogConfig::from_config(&config)) {
        eprintln!("{e}");
        return ExitCode::from(exitcode::SOFTWARE as u8);
    }

    info!("Starting gobo v{}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = config.port,
        environment = %config.environment,
        max_requests = config.rate_limit_max_requests,
        window_ms = config.rate_limit_window.as_millis() as u64,
        cache_enabled = config.cache_enabled,
        "Configuration loaded"
    );

    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    }

    let state = AppState::new(config.clone()).map_err(|e| {
        error!("Invalid rate limit configuration: {e}");
        exitcode::CONFIG
    })?;

    if let Err(e) = check_cache(&state).await {
        error!("Cache unavailable at startup: {e}");
        state.shutdown().await;
        return Err(exitcode::UNAVAILABLE);
    }

    let app = build_router(state.clone());

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /          - Greeting");
    info!("  GET  /examples  - List examples");
    info!("  POST /examples  - Create example (Basic auth, rate limited)");

    // Connect info supplies the peer address used as the rate-limit key.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Ping the attached cache, if any.
async fn check_cache(state: &AppState) -> Result<(), AppError> {
    let Some(cache) = &state.cache else {
        info!("Cache disabled");
        return Ok(());
    };

    cache
        .ping()
        .await
        .map_err(|e| AppError::storage(StorageOperation::Cache, e))?;
    info!("Cache reachable");
    Ok(())
}
