#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use common::{
    EngineConfig, EngineEvent, EngineSnapshot, EventSink, FetchError, NullSink, OrderIntent,
    PriceSource, TradeSignal,
};
use engine::EngineController;
use strategy::{MomentumStrategy, SignalStrategy};

/// Replays a fixed script of outcomes, then repeats `fallback` forever.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<f64, FetchError>>>,
    fallback: Result<f64, FetchError>,
    pub calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(
        script: impl IntoIterator<Item = Result<f64, FetchError>>,
        fallback: Result<f64, FetchError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn prices(prices: &[f64]) -> Self {
        let last = prices.last().copied().unwrap_or(100.0);
        Self::new(prices.iter().map(|&p| Ok(p)), Ok(last))
    }

    pub fn constant(price: f64) -> Self {
        Self::new([], Ok(price))
    }

    pub fn failing(message: &str) -> Self {
        Self::new([], Err(FetchError::Transport(message.to_string())))
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch(&self, _market: &str) -> Result<f64, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Tracks how many fetches overlap.
#[derive(Default)]
pub struct ConcurrencyProbe {
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

#[async_trait]
impl PriceSource for ConcurrencyProbe {
    async fn fetch(&self, _market: &str) -> Result<f64, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(100.0)
    }
}

/// Answers with `outcome` after `delay`.
pub struct SlowSource {
    delay: Duration,
    outcome: Result<f64, FetchError>,
    pub calls: AtomicUsize,
}

impl SlowSource {
    pub fn new(delay: Duration, outcome: Result<f64, FetchError>) -> Self {
        Self {
            delay,
            outcome,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PriceSource for SlowSource {
    async fn fetch(&self, _market: &str) -> Result<f64, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.outcome.clone()
    }
}

/// Never answers within any reasonable test window.
pub struct HangingSource;

#[async_trait]
impl PriceSource for HangingSource {
    async fn fetch(&self, _market: &str) -> Result<f64, FetchError> {
        tokio::time::sleep(Duration::from_secs(3)).await;
        Ok(100.0)
    }
}

/// Panics on the first price it sees.
pub struct PanickingStrategy;

impl SignalStrategy for PanickingStrategy {
    fn name(&self) -> &str {
        "panicking"
    }

    fn signal(&self, _previous: Option<f64>, _current: f64) -> TradeSignal {
        panic!("strategy failed to evaluate");
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<EngineEvent>>,
    pub orders: Mutex<Vec<OrderIntent>>,
}

impl EventSink for RecordingSink {
    fn append(&self, event: &EngineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn record_order(&self, intent: &OrderIntent) {
        self.orders.lock().unwrap().push(intent.clone());
    }
}

pub fn config(poll_secs: f64, max_failures: u32) -> EngineConfig {
    EngineConfig::new("KRW-BTC", poll_secs, true, max_failures).unwrap()
}

pub fn controller(source: Arc<dyn PriceSource>, config: EngineConfig) -> EngineController {
    EngineController::new(config, source, Arc::new(MomentumStrategy), Arc::new(NullSink))
}

/// Poll `status()` until `pred` holds or `within` elapses.
pub async fn wait_for<F>(engine: &EngineController, within: Duration, pred: F) -> EngineSnapshot
where
    F: Fn(&EngineSnapshot) -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        let snap = engine.status().await;
        if pred(&snap) || tokio::time::Instant::now() >= deadline {
            return snap;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
