//! Read-only status endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::game_loop::{now_ms, GameCommand};
use crate::state::WorldStats;
use crate::ws::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub players: usize,
    pub timestamp: u64,
}

async fn fetch_stats(app_state: &AppState) -> Result<WorldStats, StatusCode> {
    let (resp_tx, resp_rx) = oneshot::channel();
    app_state
        .game_tx
        .send(GameCommand::Stats { response: resp_tx })
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    resp_rx.await.map_err(|_| StatusCode::SERVICE_UNAVAILABLE)
}

/// `GET /api/health`
pub async fn health_handler(State(app_state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    let stats = fetch_stats(&app_state).await?;
    Ok(Json(HealthResponse {
        status: "online",
        players: stats.total_players,
        timestamp: now_ms(),
    }))
}

/// `GET /api/stats`
pub async fn stats_handler(State(app_state): State<AppState>) -> Result<Json<WorldStats>, StatusCode> {
    fetch_stats(&app_state).await.map(Json)
}
