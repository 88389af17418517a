use std::cell::Cell;

use crate::kernel::reactive::ListenerId;
use crate::utterance::Utterance;

/// Timing counters of a queued utterance, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WrapperTiming {
    pub time_in_queue: f64,
    pub stable_time: f64,
}

/// Per-residency bookkeeping for one Utterance: timing counters plus the
/// priority listener attached while it is queued or announcing.
#[derive(Debug)]
pub struct UtteranceWrapper {
    utterance: Utterance,
    /// ms since first queued, carried over across re-adds.
    time_in_queue: Cell<f64>,
    /// ms since last (re-)added.
    stable_time: Cell<f64>,
    priority_listener: Cell<Option<ListenerId>>,
}

impl UtteranceWrapper {
    pub(crate) fn new(utterance: Utterance) -> Self {
        Self {
            utterance,
            time_in_queue: Cell::new(0.0),
            stable_time: Cell::new(0.0),
            priority_listener: Cell::new(None),
        }
    }

    pub fn utterance(&self) -> &Utterance {
        &self.utterance
    }

    pub fn time_in_queue(&self) -> f64 {
        self.time_in_queue.get()
    }

    pub fn stable_time(&self) -> f64 {
        self.stable_time.get()
    }

    pub fn timing(&self) -> WrapperTiming {
        WrapperTiming {
            time_in_queue: self.time_in_queue(),
            stable_time: self.stable_time(),
        }
    }

    pub(crate) fn set_time_in_queue(&self, ms: f64) {
        self.time_in_queue.set(ms);
    }

    pub(crate) fn set_stable_time(&self, ms: f64) {
        self.stable_time.set(ms);
    }

    pub(crate) fn step(&self, dt_ms: f64) {
        self.time_in_queue.set(self.time_in_queue.get() + dt_ms);
        self.stable_time.set(self.stable_time.get() + dt_ms);
    }

    /// Stable long enough, or waited past the hard ceiling.
    pub fn is_ready(&self) -> bool {
        self.stable_time.get() > self.utterance.alert_stable_delay()
            || self.time_in_queue.get() > self.utterance.alert_maximum_delay()
    }

    pub fn has_priority_listener(&self) -> bool {
        self.priority_listener.get().is_some()
    }

    /// Lazily links `listener` to the utterance's priority. The caller runs
    /// the first prioritization pass itself, after the id is recorded, so a
    /// re-entrant dispose during that pass can detach it.
    pub(crate) fn set_priority_listener(&self, listener: impl Fn(&f64) + 'static) {
        debug_assert!(
            !self.has_priority_listener(),
            "priority listener already attached for utterance {}",
            self.utterance.id()
        );
        if self.has_priority_listener() {
            return;
        }
        let id = self.utterance.lazy_link_priority(listener);
        self.priority_listener.set(Some(id));
    }

    /// Detaches the priority listener. Safe to call any number of times.
    pub(crate) fn dispose(&self) {
        if let Some(id) = self.priority_listener.take() {
            self.utterance.unlink_priority(id);
        }
    }
}
