use std::cell::{Cell, RefCell};

use tracing::info;

use super::{priority_cancels, speech_synthesis_cancels, Announcer};
use crate::kernel::reactive::Emitter;
use crate::utterance::{AnnouncerOptions, Utterance};

/// When a `RecordingAnnouncer` reports an announcement as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Completion fires synchronously inside `announce` (aria-live style).
    #[default]
    Immediate,
    /// The announcement stays in progress until `finish` or an interruption.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// See `priority_cancels`.
    #[default]
    Priority,
    /// See `speech_synthesis_cancels`.
    SpeechSynthesis,
}

/// Reference announcer: produces no output, records what it would say.
///
/// Interrupts its in-progress announcement when the queue reports a new
/// front that outranks it, the way a speech-synthesis announcer does.
#[derive(Debug)]
pub struct RecordingAnnouncer {
    ready: Cell<bool>,
    has_spoken: Cell<bool>,
    respect_response_collector: Cell<bool>,
    completion: Cell<CompletionMode>,
    policy: Cell<CancelPolicy>,
    speaking: RefCell<Option<Utterance>>,
    spoken: RefCell<Vec<String>>,
    announced: RefCell<Vec<Utterance>>,
    interrupted: RefCell<Vec<Utterance>>,
    priority_changes: Cell<usize>,
    complete_emitter: Emitter<Utterance>,
}

impl Default for RecordingAnnouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self {
            ready: Cell::new(true),
            has_spoken: Cell::new(true),
            respect_response_collector: Cell::new(true),
            completion: Cell::new(CompletionMode::default()),
            policy: Cell::new(CancelPolicy::default()),
            speaking: RefCell::new(None),
            spoken: RefCell::new(Vec::new()),
            announced: RefCell::new(Vec::new()),
            interrupted: RefCell::new(Vec::new()),
            priority_changes: Cell::new(0),
            complete_emitter: Emitter::new(),
        }
    }

    pub fn with_policy(self, policy: CancelPolicy) -> Self {
        self.policy.set(policy);
        self
    }

    pub fn with_completion(self, completion: CompletionMode) -> Self {
        self.completion.set(completion);
        self
    }

    /// Starts in the cold "never spoken" state when `false`.
    pub fn with_has_spoken(self, has_spoken: bool) -> Self {
        self.has_spoken.set(has_spoken);
        self
    }

    pub fn with_ready(self, ready: bool) -> Self {
        self.ready.set(ready);
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    pub fn set_has_spoken(&self, has_spoken: bool) {
        self.has_spoken.set(has_spoken);
    }

    pub fn set_respect_response_collector_properties(&self, respect: bool) {
        self.respect_response_collector.set(respect);
    }

    /// Utterance currently "speaking" (manual completion only).
    pub fn speaking(&self) -> Option<Utterance> {
        self.speaking.borrow().clone()
    }

    /// Drains the texts announced so far.
    pub fn take_spoken(&self) -> Vec<String> {
        std::mem::take(&mut *self.spoken.borrow_mut())
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.borrow().clone()
    }

    pub fn announced(&self) -> Vec<Utterance> {
        self.announced.borrow().clone()
    }

    pub fn interrupted(&self) -> Vec<Utterance> {
        self.interrupted.borrow().clone()
    }

    pub fn priority_change_count(&self) -> usize {
        self.priority_changes.get()
    }

    /// Completes the in-progress announcement, if any.
    pub fn finish(&self) -> Option<Utterance> {
        let finished = self.speaking.borrow_mut().take();
        if let Some(utterance) = &finished {
            self.complete_emitter.emit(utterance);
        }
        finished
    }

    fn interrupt(&self, utterance: &Utterance) {
        let matches = self
            .speaking
            .borrow()
            .as_ref()
            .is_some_and(|current| current.ptr_eq(utterance));
        if !matches {
            return;
        }
        self.speaking.borrow_mut().take();
        info!("Interrupted utterance {}", utterance.id());
        self.interrupted.borrow_mut().push(utterance.clone());
        self.complete_emitter.emit(utterance);
    }
}

impl Announcer for RecordingAnnouncer {
    // Busy while a manual announcement is in progress.
    fn ready_to_announce(&self) -> bool {
        self.ready.get() && self.speaking.borrow().is_none()
    }

    fn has_spoken(&self) -> bool {
        self.has_spoken.get()
    }

    fn respect_response_collector_properties(&self) -> bool {
        self.respect_response_collector.get()
    }

    fn announce(&self, text: &str, utterance: &Utterance, _options: &AnnouncerOptions) {
        info!("[ANNOUNCE-{}] '{}'", utterance.id(), text);
        self.spoken.borrow_mut().push(text.to_string());
        self.announced.borrow_mut().push(utterance.clone());
        self.has_spoken.set(true);

        match self.completion.get() {
            CompletionMode::Immediate => self.complete_emitter.emit(utterance),
            CompletionMode::Manual => {
                // A new announcement replaces whatever was still in progress.
                let previous = self.speaking.borrow_mut().replace(utterance.clone());
                if let Some(previous) = previous {
                    if !previous.ptr_eq(utterance) {
                        self.interrupted.borrow_mut().push(previous.clone());
                        self.complete_emitter.emit(&previous);
                    }
                }
            }
        }
    }

    fn should_utterance_cancel_other(&self, utterance: &Utterance, to_cancel: &Utterance) -> bool {
        match self.policy.get() {
            CancelPolicy::Priority => priority_cancels(utterance, to_cancel),
            CancelPolicy::SpeechSynthesis => speech_synthesis_cancels(utterance, to_cancel),
        }
    }

    fn on_utterance_priority_change(&self, next: &Utterance) {
        self.priority_changes.set(self.priority_changes.get() + 1);
        let current = self.speaking();
        if let Some(current) = current {
            if self.should_utterance_cancel_other(next, &current) {
                self.interrupt(&current);
            }
        }
    }

    fn cancel_utterance(&self, utterance: &Utterance) {
        self.interrupt(utterance);
    }

    fn cancel(&self) {
        let current = self.speaking();
        if let Some(current) = current {
            self.interrupt(&current);
        }
    }

    fn announcement_complete_emitter(&self) -> &Emitter<Utterance> {
        &self.complete_emitter
    }
}
