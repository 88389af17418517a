pub mod alertable;
pub mod response;
pub mod utterance;

pub use alertable::{Alertable, VoicingResponse};
pub use response::{ResponseCollector, ResponsePacket};
pub use utterance::{AnnouncerOptions, AnnouncingFeature, Utterance, UtteranceId, UtteranceOptions};
