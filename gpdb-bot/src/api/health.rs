//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use gpdb_common::queue::QueueStats;
use serde::Serialize;

use crate::AppState;

/// Health check response: status, module name, version, uptime and the
/// write queue counters
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_secs: u64,
    pub queue: QueueStats,
    pub pending_writes: u64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue = state.queue.stats();

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "gpdb-bot".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.startup_time.elapsed().as_secs(),
        pending_writes: queue.pending(),
        queue,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
