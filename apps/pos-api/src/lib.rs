//! # Tavola POS API
//!
//! REST surface of the order engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          POS API Routes                                 │
//! │                                                                         │
//! │  ┌────────────────────────┐  ┌────────────────┐  ┌────────────────────┐│
//! │  │  /orders               │  │  /tables       │  │  /inventory        ││
//! │  │                        │  │                │  │                    ││
//! │  │ • POST   create        │  │ • GET  list    │  │ • POST adjust      ││
//! │  │ • GET    list / get    │  │ • GET  one     │  │ • GET  logs        ││
//! │  │ • GET    kitchen       │  │ • POST reset   │  │                    ││
//! │  │ • GET    track (public)│  │                │  │                    ││
//! │  │ • PATCH  status        │  └────────────────┘  └────────────────────┘│
//! │  │ • POST   pay / void    │                                            │
//! │  │ • GET    transactions  │  ┌────────────────┐                        │
//! │  └────────────────────────┘  │  /health       │                        │
//! │                              └────────────────┘                        │
//! │                                                                         │
//! │  Caller extractor: Bearer JWT → staff / owner                          │
//! │                    no header + ?branch_id= → web guest                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ApiConfig`]):
//! - `HTTP_PORT` - listen port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./tavola.db)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `TAX_RATE_BPS` / `SERVICE_CHARGE_BPS` - pricing rates
//! - `ORDER_CREATION_MODE` - `transactional` or `compensating`

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tavola_orders::OrderEngine;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// Re-exports
pub use auth::{Caller, JwtManager};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: OrderEngine,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(engine: OrderEngine, jwt: JwtManager) -> Self {
        AppState {
            engine,
            jwt: Arc::new(jwt),
        }
    }
}

/// Creates the application router with all routes and shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create).get(routes::orders::list))
        .route("/orders/kitchen", get(routes::orders::kitchen))
        .route("/orders/track/{order_number}", get(routes::orders::track))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/status", patch(routes::orders::update_status))
        .route("/orders/{id}/pay", post(routes::orders::pay))
        .route("/orders/{id}/void", post(routes::orders::void))
        .route("/orders/{id}/transactions", get(routes::orders::transactions))
        .route("/tables", get(routes::tables::list))
        .route("/tables/{id}", get(routes::tables::get))
        .route("/tables/{id}/reset", post(routes::tables::reset))
        .route("/inventory/adjust", post(routes::inventory::adjust))
        .route("/inventory/logs", get(routes::inventory::logs))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
