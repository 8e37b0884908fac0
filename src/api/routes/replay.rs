//! Replay Routes
//!
//! - POST /api/v1/replay/restart - Restart the medal race from the first date
//! - POST /api/v1/replay/stop - Stop the running replay
//! - GET /api/v1/replay/status - Progress of the current run
//! - GET /api/v1/replay/final - Final medal table

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{FinalTableResponse, RestartResponse};
use crate::api::state::AppState;
use crate::replay::ReplayStatus;

/// POST /api/v1/replay/restart
pub async fn restart_replay(State(state): State<Arc<AppState>>) -> Json<RestartResponse> {
    let player = state.dashboard.replay();
    let run = player.restart().await;

    Json(RestartResponse {
        run,
        dates: player.sequencer().len(),
        interval_ms: player.cadence().as_millis() as u64,
    })
}

/// POST /api/v1/replay/stop
pub async fn stop_replay(State(state): State<Arc<AppState>>) -> StatusCode {
    state.dashboard.replay().stop().await;
    StatusCode::NO_CONTENT
}

/// GET /api/v1/replay/status
pub async fn replay_status(State(state): State<Arc<AppState>>) -> Json<ReplayStatus> {
    Json(state.dashboard.replay().status().await)
}

/// GET /api/v1/replay/final
pub async fn final_table(State(state): State<Arc<AppState>>) -> Json<FinalTableResponse> {
    let table = state.dashboard.replay().sequencer().final_table();

    Json(FinalTableResponse {
        countries: table.len(),
        table,
    })
}
