//! Arena server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod ai;
pub mod combat;
pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod game_loop;
pub mod http;
pub mod movement;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod terrain;
pub mod ws;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

/// All HTTP and WebSocket routes.
pub fn router(app_state: ws::AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/health", get(http::health_handler))
        .route("/api/stats", get(http::stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
