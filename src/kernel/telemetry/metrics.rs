use std::collections::VecDeque;

use serde::Serialize;

use super::event::{DropReason, QueueEvent};

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueSnapshot {
    pub flow: FlowStats,
    pub wait: WaitStats,
    pub drops: DropStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowStats {
    pub enqueued: u64,
    pub replaced: u64,
    pub priority_cancelled: u64,
    pub removed: u64,
    pub announced: u64,
    pub completed: u64,
    pub cleared: u64,
}

/// Time spent queued before the announcer received the utterance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WaitStats {
    pub samples: u64,
    pub total_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DropStats {
    pub outranked: u64,
    pub muted: u64,
    pub gated: u64,
    pub empty_text: u64,
    pub disposed: u64,
}

pub fn compute_snapshot(events: &VecDeque<QueueEvent>) -> QueueSnapshot {
    let mut snap = QueueSnapshot::default();

    for event in events {
        match event {
            QueueEvent::Enqueued { .. } => snap.flow.enqueued += 1,
            QueueEvent::Replaced { .. } => snap.flow.replaced += 1,
            QueueEvent::PriorityCancelled { .. } => snap.flow.priority_cancelled += 1,
            QueueEvent::Removed { .. } => snap.flow.removed += 1,
            QueueEvent::Announced { time_in_queue_ms, .. } => {
                snap.flow.announced += 1;
                // announce_immediately reports an infinite wait; it never waited.
                let waited = if time_in_queue_ms.is_finite() { *time_in_queue_ms } else { 0.0 };
                snap.wait.samples += 1;
                snap.wait.total_ms += waited;
                if waited > snap.wait.max_ms {
                    snap.wait.max_ms = waited;
                }
            }
            QueueEvent::Dropped { reason, .. } => match reason {
                DropReason::Outranked => snap.drops.outranked += 1,
                DropReason::Muted => snap.drops.muted += 1,
                DropReason::Gated => snap.drops.gated += 1,
                DropReason::EmptyText => snap.drops.empty_text += 1,
                DropReason::Disposed => snap.drops.disposed += 1,
            },
            QueueEvent::Completed { .. } => snap.flow.completed += 1,
            QueueEvent::Cleared { count } => snap.flow.cleared += *count as u64,
        }
    }

    if snap.wait.samples > 0 {
        snap.wait.avg_ms = snap.wait.total_ms / snap.wait.samples as f64;
    }

    snap
}
