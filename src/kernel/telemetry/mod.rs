//! Queue telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside scheduling decisions (queue, prioritization, dispatch).
//! It exists solely for observability and verification.
//!
//! # PRIVACY INVARIANT
//! Telemetry events must **NEVER** contain utterance text.
//! Only `UtteranceId`s, durations and counts are allowed.

pub mod event;
pub mod metrics;
pub mod recorder;
