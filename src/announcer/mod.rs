//! The output side of the pipeline.
//!
//! The queue decides *what* is announced and *when*; an `Announcer` performs
//! the output (aria-live injection, speech synthesis) and owns interruption
//! of in-progress speech.

pub mod recording;

pub use recording::{CancelPolicy, CompletionMode, RecordingAnnouncer};

use crate::kernel::reactive::Emitter;
use crate::utterance::{AnnouncerOptions, Utterance};

pub trait Announcer {
    /// The queue only dispatches while this is true; otherwise it retries next step.
    fn ready_to_announce(&self) -> bool;

    /// False until the first successful announcement. Some output channels
    /// refuse to speak before a user gesture, so a queue routes everything
    /// through `announce_immediately` until this flips.
    fn has_spoken(&self) -> bool;

    /// Whether resolved responses honour the `ResponseCollector` flags.
    fn respect_response_collector_properties(&self) -> bool {
        true
    }

    fn announce(&self, text: &str, utterance: &Utterance, options: &AnnouncerOptions);

    /// Authoritative "should `utterance` remove `to_cancel`" comparison.
    fn should_utterance_cancel_other(&self, utterance: &Utterance, to_cancel: &Utterance) -> bool {
        priority_cancels(utterance, to_cancel)
    }

    /// `next` is the new front of the queue. An announcer may interrupt its
    /// current output here.
    fn on_utterance_priority_change(&self, _next: &Utterance) {}

    fn cancel_utterance(&self, utterance: &Utterance);

    fn cancel(&self);

    /// Fires once per finished (or interrupted) announcement.
    fn announcement_complete_emitter(&self) -> &Emitter<Utterance>;
}

/// Strict priority rule: only a strictly higher priority cancels, and
/// `cancel_other == false` vetoes cancelling a different utterance. Equal
/// priority never cancels.
pub fn priority_cancels(utterance: &Utterance, to_cancel: &Utterance) -> bool {
    if !utterance.ptr_eq(to_cancel) && !utterance.cancel_other() {
        return false;
    }
    to_cancel.priority() < utterance.priority()
}

/// Speech-synthesis rule: differing priorities compare strictly; at equal
/// priority the canceller's `cancel_other` (or `cancel_self` when both are
/// the same utterance) decides.
pub fn speech_synthesis_cancels(utterance: &Utterance, to_cancel: &Utterance) -> bool {
    let (priority, other_priority) = (utterance.priority(), to_cancel.priority());
    if priority != other_priority {
        other_priority < priority
    } else if utterance.ptr_eq(to_cancel) {
        utterance.cancel_self()
    } else {
        utterance.cancel_other()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utterance::UtteranceOptions;

    fn with(priority: f64, cancel_other: bool) -> Utterance {
        Utterance::new(UtteranceOptions {
            alert: "x".into(),
            priority,
            announcer_options: AnnouncerOptions {
                cancel_other,
                ..AnnouncerOptions::default()
            },
            ..UtteranceOptions::default()
        })
    }

    #[test]
    fn priority_rule() {
        assert!(priority_cancels(&with(2.0, true), &with(1.0, true)));
        assert!(!priority_cancels(&with(1.0, true), &with(1.0, true)));
        assert!(!priority_cancels(&with(1.0, true), &with(2.0, true)));
        // Overrides only prevent.
        assert!(!priority_cancels(&with(9.0, false), &with(1.0, true)));
    }

    #[test]
    fn speech_synthesis_rule() {
        assert!(speech_synthesis_cancels(&with(1.0, true), &with(1.0, true)));
        assert!(!speech_synthesis_cancels(&with(1.0, false), &with(1.0, true)));
        assert!(speech_synthesis_cancels(&with(3.0, false), &with(1.0, true)));
        assert!(!speech_synthesis_cancels(&with(1.0, true), &with(3.0, true)));

        let same = with(1.0, true);
        assert!(speech_synthesis_cancels(&same, &same));
        same.set_announcer_options(AnnouncerOptions {
            cancel_self: false,
            ..AnnouncerOptions::default()
        });
        assert!(!speech_synthesis_cancels(&same, &same));
    }
}
