pub mod config;
pub mod queue;
pub mod wrapper;

pub use config::QueueConfig;
pub use queue::UtteranceQueue;
pub use wrapper::{UtteranceWrapper, WrapperTiming};
