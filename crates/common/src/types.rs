use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Run state of the engine controller.
///
/// Legal transitions: `Idle -> Running -> Stopping -> Idle`, `Running -> Error`
/// and `Error -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Stopping,
    Error,
}

impl RunStatus {
    /// True for the states in which a worker task may be alive.
    pub fn is_active(self) -> bool {
        matches!(self, RunStatus::Running | RunStatus::Stopping)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "IDLE"),
            RunStatus::Running => write!(f, "RUNNING"),
            RunStatus::Stopping => write!(f, "STOPPING"),
            RunStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Discrete output of a signal strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSignal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl TradeSignal {
    /// Buy and Sell are the signals that produce an attempted action.
    pub fn is_actionable(self) -> bool {
        !matches!(self, TradeSignal::Hold)
    }
}

impl std::fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSignal::Buy => write!(f, "BUY"),
            TradeSignal::Sell => write!(f, "SELL"),
            TradeSignal::Hold => write!(f, "HOLD"),
        }
    }
}

/// Point-in-time copy of the controller state handed out to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub status: RunStatus,
    pub market: String,
    /// When true no real order is ever attempted.
    pub paper_mode: bool,
    /// Number of completed poll cycles.
    pub iteration: u64,
    pub last_price: Option<f64>,
    pub last_signal: TradeSignal,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub max_consecutive_failures: u32,
    pub worker_alive: bool,
    pub updated_at: DateTime<Utc>,
}

impl EngineSnapshot {
    pub fn new(market: impl Into<String>, paper_mode: bool, max_consecutive_failures: u32) -> Self {
        Self {
            status: RunStatus::Idle,
            market: market.into(),
            paper_mode,
            iteration: 0,
            last_price: None,
            last_signal: TradeSignal::Hold,
            last_error: None,
            consecutive_failures: 0,
            max_consecutive_failures,
            worker_alive: false,
            updated_at: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Severity of an [`EngineEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for EventLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventLevel::Debug => write!(f, "DEBUG"),
            EventLevel::Info => write!(f, "INFO"),
            EventLevel::Warn => write!(f, "WARN"),
            EventLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for EventLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(EventLevel::Debug),
            "INFO" => Ok(EventLevel::Info),
            "WARN" | "WARNING" => Ok(EventLevel::Warn),
            "ERROR" => Ok(EventLevel::Error),
            other => Err(crate::Error::Other(format!("unknown event level '{other}'"))),
        }
    }
}

/// Timestamped operational event. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub ts: DateTime<Utc>,
    pub level: EventLevel,
    pub message: String,
}

impl EngineEvent {
    pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

/// Whether a recorded action belongs to a paper or a live engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl TradingMode {
    pub fn from_paper_flag(paper_mode: bool) -> Self {
        if paper_mode {
            TradingMode::Paper
        } else {
            TradingMode::Live
        }
    }
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

/// An attempted action derived from a Buy/Sell tick.
///
/// Only ever recorded. Nothing submits it to an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub id: String,
    pub ts: DateTime<Utc>,
    pub market: String,
    pub side: TradeSignal,
    pub amount_krw: f64,
    pub mode: TradingMode,
    pub status: String,
}

impl OrderIntent {
    pub const RECORDED: &'static str = "RECORDED";

    pub fn recorded(
        market: impl Into<String>,
        side: TradeSignal,
        amount_krw: f64,
        mode: TradingMode,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ts: Utc::now(),
            market: market.into(),
            side,
            amount_krw,
            mode,
            status: Self::RECORDED.to_string(),
        }
    }
}
