use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use common::{
    EngineConfig, EngineEvent, EngineSnapshot, EventLevel, EventSink, PriceSource, RunStatus,
};
use strategy::SignalStrategy;

use crate::event_log::EventLog;
use crate::worker;

/// Owns the poll worker lifecycle and the shared engine state.
///
/// Every read and write of the snapshot and the event log happens under one
/// mutex, and callers only ever receive copies. `stop` is the only operation
/// that waits on the worker, bounded by [`EngineConfig::stop_timeout`].
pub struct EngineController {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    pub(crate) config: EngineConfig,
    pub(crate) source: Arc<dyn PriceSource>,
    pub(crate) strategy: Arc<dyn SignalStrategy>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) inner: Mutex<Inner>,
}

pub(crate) struct Inner {
    pub(crate) snapshot: EngineSnapshot,
    events: EventLog,
    worker: Option<JoinHandle<()>>,
    cancel_tx: Option<watch::Sender<bool>>,
    /// Bumped on every start and forced reset. A worker whose epoch no longer
    /// matches must not touch the state.
    pub(crate) epoch: u64,
}

impl Inner {
    fn signal_cancel(&mut self) {
        if let Some(tx) = &self.cancel_tx {
            let _ = tx.send(true);
        }
    }
}

impl Shared {
    /// Append an event to the ring and mirror it to the sink and the process log.
    pub(crate) fn record(&self, inner: &mut Inner, level: EventLevel, message: impl Into<String>) {
        let event = EngineEvent::new(level, message);
        let market = self.config.market.as_str();
        match level {
            EventLevel::Debug => debug!(%market, "{}", event.message),
            EventLevel::Info => info!(%market, "{}", event.message),
            EventLevel::Warn => warn!(%market, "{}", event.message),
            EventLevel::Error => error!(%market, "{}", event.message),
        }
        self.sink.append(&event);
        inner.events.push(event);
    }

    /// Fold the worker task's real liveness into the snapshot. A task that
    /// finished while the status still reads Running panicked, so the engine
    /// moves to Error.
    fn reconcile_worker(&self, inner: &mut Inner) {
        let finished = inner.worker.as_ref().is_some_and(|h| h.is_finished());
        if !finished {
            return;
        }
        inner.worker = None;
        inner.cancel_tx = None;
        inner.snapshot.worker_alive = false;

        let status = inner.snapshot.status;
        match status {
            RunStatus::Running => {
                inner.snapshot.status = RunStatus::Error;
                inner.snapshot.last_error = Some("worker terminated abnormally".to_string());
                inner.snapshot.touch();
                self.record(
                    inner,
                    EventLevel::Error,
                    "Worker terminated abnormally; engine switched to ERROR",
                );
            }
            RunStatus::Stopping => {
                inner.snapshot.status = RunStatus::Idle;
                inner.snapshot.touch();
                self.record(inner, EventLevel::Info, "Engine stopped");
            }
            RunStatus::Idle | RunStatus::Error => {}
        }
    }
}

impl EngineController {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn PriceSource>,
        strategy: Arc<dyn SignalStrategy>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let inner = Inner {
            snapshot: EngineSnapshot::new(
                config.market.clone(),
                config.paper_mode,
                config.max_consecutive_failures,
            ),
            events: EventLog::new(config.event_log_capacity),
            worker: None,
            cancel_tx: None,
            epoch: 0,
        };

        let shared = Arc::new(Shared {
            config,
            source,
            strategy,
            sink,
            inner: Mutex::new(inner),
        });

        // Nothing else can hold the lock yet.
        if let Ok(mut inner) = shared.inner.try_lock() {
            let message = format!(
                "Engine initialized (strategy={}, paper_mode={})",
                shared.strategy.name(),
                shared.config.paper_mode
            );
            shared.record(&mut inner, EventLevel::Info, message);
        }

        Self { shared }
    }

    /// Launch the worker. A no-op while Running or Stopping.
    ///
    /// Starting from Error clears `last_error` and the failure counter.
    pub async fn start(&self) -> EngineSnapshot {
        let mut inner = self.shared.inner.lock().await;
        self.shared.reconcile_worker(&mut inner);
        if inner.snapshot.status.is_active() {
            return inner.snapshot.clone();
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        inner.epoch += 1;
        let epoch = inner.epoch;

        inner.snapshot.status = RunStatus::Running;
        inner.snapshot.last_error = None;
        inner.snapshot.consecutive_failures = 0;
        inner.snapshot.worker_alive = true;
        inner.snapshot.touch();
        self.shared.record(&mut inner, EventLevel::Info, "Engine started");

        inner.cancel_tx = Some(cancel_tx);
        inner.worker = Some(tokio::spawn(worker::run(
            self.shared.clone(),
            epoch,
            cancel_rx,
        )));

        inner.snapshot.clone()
    }

    /// Request the worker to exit and wait for it, up to the stop timeout.
    ///
    /// From Error this goes straight to Idle, keeping `last_error` for inspection.
    pub async fn stop(&self) -> EngineSnapshot {
        let (epoch, mut handle) = {
            let mut inner = self.shared.inner.lock().await;
            self.shared.reconcile_worker(&mut inner);
            let status = inner.snapshot.status;
            match status {
                RunStatus::Idle => return inner.snapshot.clone(),
                RunStatus::Error => {
                    inner.snapshot.status = RunStatus::Idle;
                    inner.snapshot.consecutive_failures = 0;
                    inner.snapshot.worker_alive = false;
                    inner.snapshot.touch();
                    inner.worker = None;
                    inner.cancel_tx = None;
                    self.shared.record(
                        &mut inner,
                        EventLevel::Info,
                        "Engine reset to IDLE from ERROR",
                    );
                    return inner.snapshot.clone();
                }
                RunStatus::Running => {
                    inner.snapshot.status = RunStatus::Stopping;
                    inner.snapshot.touch();
                    inner.signal_cancel();
                    self.shared.record(&mut inner, EventLevel::Info, "Stop requested");
                }
                // A previous stop timed out; wait again below.
                RunStatus::Stopping => {}
            }

            match inner.worker.take() {
                Some(handle) => (inner.epoch, handle),
                // Another caller is already waiting on the worker.
                None => return inner.snapshot.clone(),
            }
        };

        let timeout = self.shared.config.stop_timeout();
        let outcome = tokio::time::timeout(timeout, &mut handle).await;

        let mut inner = self.shared.inner.lock().await;
        if inner.epoch == epoch {
            match outcome {
                Ok(joined) => {
                    inner.snapshot.worker_alive = false;
                    if let Err(e) = joined {
                        let message = format!("Worker terminated abnormally: {e}");
                        self.shared.record(&mut inner, EventLevel::Error, message);
                    }
                    if inner.snapshot.status == RunStatus::Stopping {
                        inner.snapshot.status = RunStatus::Idle;
                    }
                }
                Err(_) => {
                    let message =
                        format!("Worker did not exit within {timeout:?}; still STOPPING");
                    self.shared.record(&mut inner, EventLevel::Warn, message);
                    inner.snapshot.worker_alive = !handle.is_finished();
                    if inner.worker.is_none() {
                        inner.worker = Some(handle);
                    }
                }
            }
        }
        inner.snapshot.touch();
        inner.snapshot.clone()
    }

    /// Force the engine back to Idle. Refused while Running.
    pub async fn reset(&self) -> EngineSnapshot {
        let mut inner = self.shared.inner.lock().await;
        self.shared.reconcile_worker(&mut inner);
        if inner.snapshot.status == RunStatus::Running {
            self.shared.record(
                &mut inner,
                EventLevel::Warn,
                "Reset ignored while RUNNING. Use stop first.",
            );
            return inner.snapshot.clone();
        }

        // A worker stuck in Stopping is cancelled and orphaned; the epoch bump
        // keeps it from writing once it wakes up.
        inner.signal_cancel();
        inner.epoch += 1;
        inner.worker = None;
        inner.cancel_tx = None;

        inner.snapshot.status = RunStatus::Idle;
        inner.snapshot.last_error = None;
        inner.snapshot.consecutive_failures = 0;
        inner.snapshot.worker_alive = false;
        inner.snapshot.touch();
        self.shared.record(&mut inner, EventLevel::Info, "Engine reset");
        inner.snapshot.clone()
    }

    pub async fn status(&self) -> EngineSnapshot {
        let mut inner = self.shared.inner.lock().await;
        self.shared.reconcile_worker(&mut inner);
        inner.snapshot.clone()
    }

    /// Copies of the newest events, most recent first. Never more than
    /// `limit` or the log capacity.
    pub async fn recent_events(&self, limit: usize) -> Vec<EngineEvent> {
        self.shared.inner.lock().await.events.recent(limit)
    }

    pub fn event_capacity(&self) -> usize {
        self.shared.config.event_log_capacity.max(1)
    }
}
