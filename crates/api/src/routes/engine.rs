use axum::{extract::State, routing::get, routing::post, Router};

use common::EngineSnapshot;

use crate::{ApiResponse, AppState};

pub fn engine_router() -> Router<AppState> {
    Router::new()
        .route("/api/engine/status", get(engine_status))
        .route("/api/engine/start", post(engine_start))
        .route("/api/engine/stop", post(engine_stop))
        .route("/api/engine/reset", post(engine_reset))
}

async fn engine_status(State(state): State<AppState>) -> ApiResponse<EngineSnapshot> {
    ApiResponse::success(state.engine.status().await)
}

async fn engine_start(State(state): State<AppState>) -> ApiResponse<EngineSnapshot> {
    ApiResponse::success(state.engine.start().await)
}

/// Blocks until the worker exits or the stop timeout elapses.
async fn engine_stop(State(state): State<AppState>) -> ApiResponse<EngineSnapshot> {
    ApiResponse::success(state.engine.stop().await)
}

async fn engine_reset(State(state): State<AppState>) -> ApiResponse<EngineSnapshot> {
    ApiResponse::success(state.engine.reset().await)
}
