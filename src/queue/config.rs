use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kernel::telemetry::recorder::MAX_EVENTS;
use crate::utterance::AnnouncingFeature;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// An uninitialized queue ignores every request; used when the output
    /// feature is unavailable.
    pub initialize: bool,
    pub enabled: bool,
    pub muted: bool,
    /// Extra per-utterance gate the queue checks at dispatch.
    pub feature_control: Option<AnnouncingFeature>,
    pub telemetry_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            initialize: true,
            enabled: true,
            muted: false,
            feature_control: None,
            telemetry_capacity: MAX_EVENTS,
        }
    }
}

impl QueueConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }
}
