use std::collections::VecDeque;

use common::EngineEvent;

/// Fixed-capacity FIFO of engine events. Pushing into a full log evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<EngineEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: EngineEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Copies of the newest `limit` events, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<EngineEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
