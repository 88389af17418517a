pub mod announcer;
pub mod error;
pub mod kernel;
pub mod queue;
pub mod utterance;

pub use announcer::{Announcer, CancelPolicy, CompletionMode, RecordingAnnouncer};
pub use error::ConfigError;
pub use kernel::reactive::{Emitter, ListenerId, Property};
pub use kernel::time::StepTimer;
pub use queue::{QueueConfig, UtteranceQueue};
pub use utterance::{
    Alertable, AnnouncerOptions, AnnouncingFeature, ResponseCollector, ResponsePacket, Utterance,
    UtteranceOptions, VoicingResponse,
};
