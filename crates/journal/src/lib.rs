use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use common::{EngineEvent, Error, EventLevel, EventSink, OrderIntent, Result, TradeSignal, TradingMode};

/// Default depth of the channel between the engine and the writer task.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// SQLite store for engine events and attempted actions.
#[derive(Clone)]
pub struct Journal {
    db: SqlitePool,
}

impl Journal {
    /// Open (creating if needed) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let parent = options.clone().get_filename().parent().map(Path::to_path_buf);
        if let Some(dir) = parent.filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(&dir).await?;
        }

        let db = SqlitePoolOptions::new().connect_with(options).await?;
        let journal = Self { db };
        journal.migrate().await?;
        info!(%url, "Journal database ready");
        Ok(journal)
    }

    /// Private in-memory database. A single connection that is never recycled
    /// keeps the data alive for the lifetime of the pool.
    pub async fn in_memory() -> Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        let journal = Self { db };
        journal.migrate().await?;
        Ok(journal)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.db).await?;
        Ok(())
    }

    pub async fn insert_event(&self, event: &EngineEvent) -> Result<()> {
        sqlx::query("INSERT INTO engine_events (ts, level, message) VALUES (?1, ?2, ?3)")
            .bind(format_ts(&event.ts))
            .bind(event.level.to_string())
            .bind(&event.message)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn insert_order(&self, intent: &OrderIntent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, ts, market, side, amount_krw, mode, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&intent.id)
        .bind(format_ts(&intent.ts))
        .bind(&intent.market)
        .bind(intent.side.to_string())
        .bind(intent.amount_krw)
        .bind(intent.mode)
        .bind(&intent.status)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Newest events first.
    pub async fn recent_events(&self, limit: usize) -> Result<Vec<EngineEvent>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT ts, level, message FROM engine_events ORDER BY id DESC LIMIT ?1",
        )
        .bind(clamp_limit(limit))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|(ts, level, message)| {
                Ok(EngineEvent {
                    ts: parse_ts(&ts)?,
                    level: level.parse::<EventLevel>()?,
                    message,
                })
            })
            .collect()
    }

    /// Newest attempted actions first.
    pub async fn recent_orders(&self, limit: usize) -> Result<Vec<OrderIntent>> {
        let rows: Vec<(String, String, String, String, f64, TradingMode, String)> = sqlx::query_as(
            r#"SELECT id, ts, market, side, amount_krw, mode, status
               FROM orders ORDER BY rowid DESC LIMIT ?1"#,
        )
        .bind(clamp_limit(limit))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|(id, ts, market, side, amount_krw, mode, status)| {
                Ok(OrderIntent {
                    id,
                    ts: parse_ts(&ts)?,
                    market,
                    side: parse_side(&side)?,
                    amount_krw,
                    mode,
                    status,
                })
            })
            .collect()
    }

    /// Build the non-blocking sink the engine writes to and the task that
    /// drains it into this journal.
    pub fn channel(&self, capacity: usize) -> (JournalSink, JournalWriter) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            JournalSink { tx },
            JournalWriter {
                rx,
                journal: self.clone(),
            },
        )
    }
}

fn clamp_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("invalid timestamp '{raw}' in journal: {e}")))
}

fn parse_side(raw: &str) -> Result<TradeSignal> {
    match raw {
        "BUY" => Ok(TradeSignal::Buy),
        "SELL" => Ok(TradeSignal::Sell),
        "HOLD" => Ok(TradeSignal::Hold),
        other => Err(Error::Other(format!("invalid order side '{other}' in journal"))),
    }
}

/// Entries flowing from the engine to the writer.
#[derive(Debug, Clone)]
pub enum JournalEntry {
    Event(EngineEvent),
    Order(OrderIntent),
}

/// [`EventSink`] backed by a bounded channel. Never blocks: a full or closed
/// channel drops the entry with a warning.
#[derive(Clone)]
pub struct JournalSink {
    tx: mpsc::Sender<JournalEntry>,
}

impl JournalSink {
    fn offer(&self, entry: JournalEntry) {
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Journal channel full, entry dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Journal writer gone, entry dropped");
            }
        }
    }
}

impl EventSink for JournalSink {
    fn append(&self, event: &EngineEvent) {
        self.offer(JournalEntry::Event(event.clone()));
    }

    fn record_order(&self, intent: &OrderIntent) {
        self.offer(JournalEntry::Order(intent.clone()));
    }
}

/// Drains the journal channel into SQLite. Call `run` from `tokio::spawn`.
pub struct JournalWriter {
    rx: mpsc::Receiver<JournalEntry>,
    journal: Journal,
}

impl JournalWriter {
    /// Runs until every [`JournalSink`] clone has been dropped.
    pub async fn run(mut self) {
        info!("Journal writer running");
        while let Some(entry) = self.rx.recv().await {
            let outcome = match &entry {
                JournalEntry::Event(event) => self.journal.insert_event(event).await,
                JournalEntry::Order(intent) => self.journal.insert_order(intent).await,
            };
            if let Err(e) = outcome {
                error!(error = %e, ?entry, "Failed to persist journal entry");
            }
        }
        warn!("Journal writer: channel closed");
    }
}
