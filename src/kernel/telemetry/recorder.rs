use std::collections::VecDeque;

use super::event::QueueEvent;
use super::metrics::{compute_snapshot, QueueSnapshot};

pub const MAX_EVENTS: usize = 10_000;

/// Bounded ring buffer; the oldest event is evicted once `capacity` is reached.
#[derive(Debug)]
pub struct TelemetryRecorder {
    buffer: VecDeque<QueueEvent>,
    capacity: usize,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity.min(MAX_EVENTS)),
            capacity,
        }
    }

    pub fn record(&mut self, event: QueueEvent) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        compute_snapshot(&self.buffer)
    }

    pub fn events(&self) -> Vec<QueueEvent> {
        self.buffer.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
