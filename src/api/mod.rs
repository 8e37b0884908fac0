//! Medalboard REST API
//!
//! HTTP API layer serving chart models, built with Axum.
//!
//! # Endpoints
//!
//! ## Charts
//! - `GET /api/v1/bar` - Grouped bar chart model
//! - `GET /api/v1/countries/:country` - Category breakdown for a country
//! - `POST /api/v1/selection` - Select a country for the Sankey chart
//! - `GET /api/v1/sankey` - Current Sankey graph
//!
//! ## Replay
//! - `POST /api/v1/replay/restart` - Restart the medal race
//! - `POST /api/v1/replay/stop` - Stop the medal race
//! - `GET /api/v1/replay/status` - Current run progress
//! - `GET /api/v1/replay/final` - Final medal table
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /api/v1/ws` - Replay frames and Sankey updates
//!
//! # Example
//!
//! ```rust,ignore
//! use medalboard::api::{serve, AppState};
//! use medalboard::config::Config;
//! use medalboard::dashboard::Dashboard;
//! use medalboard::websocket::{ConnectionHub, HubConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
//!     let dashboard = Arc::new(Dashboard::load(&config, hub.clone())?);
//!
//!     let state = AppState::new(dashboard, hub, config.api.clone());
//!     serve(state, &config.api).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::websocket::{spawn_sankey_forwarder, websocket_handler};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Chart routes
        .route("/bar", get(routes::charts::get_bar_chart))
        .route("/countries/:country", get(routes::charts::get_country))
        .route("/selection", post(routes::charts::select_country))
        .route("/sankey", get(routes::charts::get_sankey))
        // Replay routes
        .route("/replay/restart", post(routes::replay::restart_replay))
        .route("/replay/stop", post(routes::replay::stop_replay))
        .route("/replay/status", get(routes::replay::replay_status))
        .route("/replay/final", get(routes::replay::final_table))
        // WebSocket route
        .route("/ws", get(websocket_handler));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config);
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
///
/// Also runs the selection listener and the Sankey → WebSocket forwarder
/// for the lifetime of the server.
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let listener_task = state.dashboard.spawn_selection_listener();
    let forwarder_task = spawn_sankey_forwarder(
        state.dashboard.sankey().watch(),
        Arc::clone(&state.ws_hub),
    );

    let dashboard = Arc::clone(&state.dashboard);
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Medalboard API listening on {}", addr);

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)));

    dashboard.replay().stop().await;
    listener_task.abort();
    forwarder_task.abort();

    result?;
    tracing::info!("Medalboard API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
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
                tracing::error!(error = %e, "Failed to install signal handler");
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
