//! Gather Server - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use gather_core::{
    api::{self, AppState},
    config::Config,
    middleware::AuthConfig,
    observability,
    store::MemoryStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config: {}. Using defaults.", e);
        Config::default()
    });

    // Initialize observability
    observability::init(
        &config.observability.log_level,
        config.observability.json_logging,
    )?;
    let metrics_handle = observability::init_metrics()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        auto_approve = config.events.auto_approve,
        "Starting Gather Server"
    );
    if config.auth.is_dev_secret() {
        tracing::warn!("Running with the insecure development JWT secret; set GATHER__AUTH__JWT_SECRET");
    }

    // Wire the components over the in-process store
    let store = Arc::new(MemoryStore::new());
    let app_state = AppState::new(store, &config).with_metrics(metrics_handle);

    let mut auth = AuthConfig::new(config.auth.jwt_secret.clone());
    if let Some(issuer) = &config.auth.issuer {
        auth = auth.with_issuer(issuer.clone());
    }

    // Build router
    let app = api::build_router(app_state, auth);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
