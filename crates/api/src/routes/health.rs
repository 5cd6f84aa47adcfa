use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Liveness probe for ops scripts.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.engine.status().await;
    Json(json!({
        "status": "ok",
        "engine": snapshot.status.to_string(),
        "paper_mode": snapshot.paper_mode,
        "journal": state.journal.is_some(),
    }))
}
