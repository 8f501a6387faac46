//! # Tavola POS API
//!
//! REST server for the restaurant order engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           POS API Server                                │
//! │                                                                         │
//! │  POS / Web Menu ───► HTTP (8080) ───► OrderEngine ───► SQLite (WAL)    │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                                   broadcast channel                     │
//! │                                   (domain events)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use tavola_db::{Database, DbConfig};
use tavola_orders::OrderEngine;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use pos_api::{build_router, ApiConfig, AppState, JwtManager};

const DEFAULT_LOG_FILTER: &str = "pos_api=info,tavola_orders=info,tavola_db=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting Tavola POS API server...");

    // Load configuration
    let config = ApiConfig::load().context("loading configuration")?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        mode = %config.creation_mode,
        "Configuration loaded"
    );

    // Open database (runs embedded migrations)
    let db = Database::new(DbConfig::new(&config.database_path).max_connections(config.db_max_connections))
        .await
        .context("opening database")?;

    // Create shared state
    let engine = OrderEngine::with_capacity(db.clone(), config.engine_config(), config.event_channel_capacity);
    let jwt = JwtManager::new(&config.jwt_secret, config.jwt_access_lifetime_secs);
    let app = build_router(AppState::new(engine, jwt));

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
