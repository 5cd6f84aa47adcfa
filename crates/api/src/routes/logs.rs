use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::error;

use crate::response::error_response;
use crate::{ApiResponse, AppState};

const DEFAULT_EVENT_LIMIT: usize = 100;
const DEFAULT_ORDER_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 1_000;

pub fn logs_router() -> Router<AppState> {
    Router::new()
        .route("/api/logs/recent", get(recent_logs))
        .route("/api/logs/history", get(log_history))
        .route("/api/orders/recent", get(recent_orders))
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

// ─── In-memory events ─────────────────────────────────────────────────────────

async fn recent_logs(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> Response {
    let limit = q
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, state.engine.event_capacity());
    ApiResponse::success(state.engine.recent_events(limit).await).into_response()
}

// ─── Journal ──────────────────────────────────────────────────────────────────

async fn log_history(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> Response {
    let Some(journal) = &state.journal else {
        return journal_unavailable();
    };
    let limit = q.limit.unwrap_or(DEFAULT_EVENT_LIMIT).clamp(1, MAX_HISTORY_LIMIT);

    match journal.recent_events(limit).await {
        Ok(events) => ApiResponse::success(events).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read event history");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn recent_orders(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> Response {
    let Some(journal) = &state.journal else {
        return journal_unavailable();
    };
    let limit = q.limit.unwrap_or(DEFAULT_ORDER_LIMIT).clamp(1, MAX_HISTORY_LIMIT);

    match journal.recent_orders(limit).await {
        Ok(orders) => ApiResponse::success(orders).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read recorded orders");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn journal_unavailable() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "journal is not configured")
}
