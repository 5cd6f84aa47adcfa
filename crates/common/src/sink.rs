use crate::{EngineEvent, OrderIntent};

/// Best-effort recorder for engine events and attempted actions.
///
/// Both methods are called while the controller holds its state lock, so they
/// must not block. Storage failures are logged by the implementation and never
/// reach the caller.
pub trait EventSink: Send + Sync {
    fn append(&self, event: &EngineEvent);

    fn record_order(&self, _intent: &OrderIntent) {}
}

/// Sink that drops everything. Used when no journal is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn append(&self, _event: &EngineEvent) {}
}
