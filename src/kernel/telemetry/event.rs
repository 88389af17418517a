use serde::{Deserialize, Serialize};

use crate::utterance::UtteranceId;

// Allowed: IDs, Durations (ms), Counts, Enums
// Forbidden: alert text, resolved responses

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueueEvent {
    Enqueued {
        utterance_id: UtteranceId,
        position: QueuePosition,
    },

    /// A stale copy was removed when the same utterance was queued again.
    Replaced {
        utterance_id: UtteranceId,
        carried_time_in_queue_ms: f64,
    },

    PriorityCancelled {
        utterance_id: UtteranceId,
        cancelled_by: UtteranceId,
    },

    /// Explicit removal (cancel_utterance).
    Removed {
        utterance_id: UtteranceId,
    },

    Announced {
        utterance_id: UtteranceId,
        time_in_queue_ms: f64,
    },

    Dropped {
        utterance_id: UtteranceId,
        reason: DropReason,
    },

    Completed {
        utterance_id: UtteranceId,
    },

    Cleared {
        count: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueuePosition {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// announce_immediately lost against the announcing utterance.
    Outranked,
    Muted,
    /// can_announce, predicate or feature gate said no.
    Gated,
    EmptyText,
    Disposed,
}
