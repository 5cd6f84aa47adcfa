use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use api::{router, AppState};
use common::{EngineConfig, FetchError, NullSink, PriceSource};
use engine::EngineController;
use journal::Journal;
use strategy::MomentumStrategy;

struct FixedPrice(f64);

#[async_trait]
impl PriceSource for FixedPrice {
    async fn fetch(&self, _market: &str) -> Result<f64, FetchError> {
        Ok(self.0)
    }
}

fn engine() -> Arc<EngineController> {
    let config = EngineConfig::new("KRW-BTC", 0.02, true, 3).unwrap();
    Arc::new(EngineController::new(
        config,
        Arc::new(FixedPrice(100.0)),
        Arc::new(MomentumStrategy),
        Arc::new(NullSink),
    ))
}

fn app(journal: Option<Journal>) -> (Router, Arc<EngineController>) {
    let engine = engine();
    let state = AppState {
        engine: engine.clone(),
        journal,
    };
    (router(state), engine)
}

async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    // Extractor rejections answer in plain text.
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn status_endpoint_wraps_snapshot_in_envelope() {
    let (app, _) = app(None);
    let (status, body) = call(&app, "GET", "/api/engine/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(body["error"].is_null());
    assert!(body["ts"].is_string());

    let data = &body["data"];
    assert_eq!(data["status"], "IDLE");
    assert_eq!(data["market"], "KRW-BTC");
    assert_eq!(data["paper_mode"], true);
    assert_eq!(data["consecutive_failures"], 0);
    assert_eq!(data["max_consecutive_failures"], 3);
    assert_eq!(data["last_signal"], "HOLD");
    assert_eq!(data["worker_alive"], false);
}

#[tokio::test]
async fn start_reset_stop_round() {
    let (app, engine) = app(None);

    let (status, body) = call(&app, "POST", "/api/engine/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "RUNNING");
    assert_eq!(body["data"]["worker_alive"], true);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(engine.status().await.iteration >= 1);

    let (_, body) = call(&app, "POST", "/api/engine/reset").await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["status"], "RUNNING");

    let (_, body) = call(&app, "POST", "/api/engine/stop").await;
    assert_eq!(body["data"]["status"], "IDLE");
    assert_eq!(body["data"]["worker_alive"], false);
}

#[tokio::test]
async fn status_only_reports_known_states() {
    let (app, _) = app(None);
    call(&app, "POST", "/api/engine/start").await;
    for _ in 0..5 {
        let (_, body) = call(&app, "GET", "/api/engine/status").await;
        let state = body["data"]["status"].as_str().unwrap().to_string();
        assert!(["IDLE", "RUNNING", "STOPPING", "ERROR"].contains(&state.as_str()));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    call(&app, "POST", "/api/engine/stop").await;
}

#[tokio::test]
async fn recent_logs_honour_limit() {
    let (app, _) = app(None);
    call(&app, "POST", "/api/engine/start").await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    call(&app, "POST", "/api/engine/stop").await;

    let (status, body) = call(&app, "GET", "/api/logs/recent?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let events = body["data"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["message"], "Engine stopped");
    assert_eq!(events[0]["level"], "INFO");

    // Zero is clamped up to one entry.
    let (_, body) = call(&app, "GET", "/api/logs/recent?limit=0").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_limit_is_rejected() {
    let (app, _) = app(None);
    let (status, _) = call(&app, "GET", "/api/logs/recent?limit=-5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn journal_routes_need_a_journal() {
    let (app, _) = app(None);
    let (status, body) = call(&app, "GET", "/api/logs/history").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "journal is not configured");

    let (status, _) = call(&app, "GET", "/api/orders/recent").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn journal_routes_read_persisted_rows() {
    let journal = Journal::in_memory().await.unwrap();
    journal
        .insert_event(&common::EngineEvent::new(
            common::EventLevel::Warn,
            "Reset ignored while RUNNING. Use stop first.",
        ))
        .await
        .unwrap();
    journal
        .insert_order(&common::OrderIntent::recorded(
            "KRW-BTC",
            common::TradeSignal::Buy,
            10_000.0,
            common::TradingMode::Paper,
        ))
        .await
        .unwrap();

    let (app, _) = app(Some(journal));
    let (status, body) = call(&app, "GET", "/api/logs/history?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["level"], "WARN");

    let (_, body) = call(&app, "GET", "/api/orders/recent").await;
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["side"], "BUY");
    assert_eq!(orders[0]["mode"], "paper");
    assert_eq!(orders[0]["status"], "RECORDED");
}

#[tokio::test]
async fn healthz_reports_engine_state() {
    let (app, _) = app(None);
    let (status, body) = call(&app, "GET", "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["engine"], "IDLE");
    assert_eq!(body["paper_mode"], true);
    assert_eq!(body["journal"], false);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (app, _) = app(None);
    let (status, _) = call(&app, "GET", "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
