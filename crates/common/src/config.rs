use std::time::Duration;

use crate::{Error, Result};

/// Default capacity of the in-memory event ring.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 500;
pub const DEFAULT_UPBIT_BASE_URL: &str = "https://api.upbit.com";

/// Fixed construction parameters of an engine controller.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub market: String,
    pub poll_interval: Duration,
    pub paper_mode: bool,
    pub max_consecutive_failures: u32,
    pub event_log_capacity: usize,
    /// Notional recorded with every attempted action.
    pub order_amount_krw: f64,
}

impl EngineConfig {
    /// Validates the engine invariants: a positive finite poll interval, a
    /// failure threshold of at least one and a non-empty event ring.
    pub fn new(
        market: impl Into<String>,
        poll_interval_secs: f64,
        paper_mode: bool,
        max_consecutive_failures: u32,
    ) -> Result<Self> {
        let market = market.into();
        if market.trim().is_empty() {
            return Err(Error::Config("market must not be empty".into()));
        }
        if !poll_interval_secs.is_finite() || poll_interval_secs <= 0.0 {
            return Err(Error::Config(format!(
                "poll interval must be a positive number of seconds, got {poll_interval_secs}"
            )));
        }
        if max_consecutive_failures < 1 {
            return Err(Error::Config(
                "max consecutive failures must be at least 1".into(),
            ));
        }

        Ok(Self {
            market,
            poll_interval: Duration::from_secs_f64(poll_interval_secs),
            paper_mode,
            max_consecutive_failures,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            order_amount_krw: 10_000.0,
        })
    }

    pub fn with_event_log_capacity(mut self, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config("event log capacity must be at least 1".into()));
        }
        self.event_log_capacity = capacity;
        Ok(self)
    }

    pub fn with_order_amount(mut self, amount_krw: f64) -> Result<Self> {
        if !amount_krw.is_finite() || amount_krw < 0.0 {
            return Err(Error::Config(format!(
                "order amount must be a non-negative number, got {amount_krw}"
            )));
        }
        self.order_amount_krw = amount_krw;
        Ok(self)
    }

    /// How long `stop` waits for the worker: three poll intervals, at least one second.
    pub fn stop_timeout(&self) -> Duration {
        (self.poll_interval * 3).max(Duration::from_secs(1))
    }

    /// Pause after a failed fetch: the poll interval capped at one second.
    pub fn failure_backoff(&self) -> Duration {
        self.poll_interval.min(Duration::from_secs(1))
    }
}

/// All process configuration, loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,

    // Strategy
    pub strategy: String,

    // Price feed
    pub upbit_base_url: String,
    pub fetch_timeout: Duration,

    // HTTP
    pub app_host: String,
    pub app_port: u16,

    // Database
    pub database_url: String,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let market = get("TRADING_MARKET").unwrap_or_else(|| "KRW-BTC".to_string());
        let poll_interval: f64 = parse_or(&get, "LOOP_INTERVAL_SEC", 5.0)?;
        // Set-but-empty is falsy; only a missing key defaults to paper trading.
        let paper_mode = match lookup("PAPER_MODE") {
            Some(v) => to_bool(&v),
            None => true,
        };
        let max_failures: u32 = parse_or(&get, "MAX_CONSECUTIVE_FAILURES", 3)?;
        let capacity: usize = parse_or(&get, "EVENT_LOG_CAPACITY", DEFAULT_EVENT_LOG_CAPACITY)?;
        let order_amount: f64 = parse_or(&get, "MAX_ORDER_KRW", 10_000.0)?;

        let engine = EngineConfig::new(market, poll_interval, paper_mode, max_failures)?
            .with_event_log_capacity(capacity)?
            .with_order_amount(order_amount)?;

        let fetch_timeout: f64 = parse_or(&get, "FETCH_TIMEOUT_SEC", 10.0)?;
        if !fetch_timeout.is_finite() || fetch_timeout <= 0.0 {
            return Err(Error::Config(format!(
                "FETCH_TIMEOUT_SEC must be positive, got {fetch_timeout}"
            )));
        }

        Ok(Config {
            engine,
            strategy: get("STRATEGY").unwrap_or_else(|| "momentum".to_string()),
            upbit_base_url: get("UPBIT_BASE_URL")
                .unwrap_or_else(|| DEFAULT_UPBIT_BASE_URL.to_string()),
            fetch_timeout: Duration::from_secs_f64(fetch_timeout),
            app_host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            app_port: parse_or(&get, "APP_PORT", 8000)?,
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://data/autocoin.db".to_string()),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            Error::Config(format!("{key} has invalid value '{}': {e}", raw.trim()))
        }),
    }
}

fn to_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
