//! Session configuration.

use lipsync_core::Config;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub core: Config,
    /// Weight for cues that do not carry one.
    pub default_cue_weight: f32,
    /// Morph target driven for the left eye blink.
    pub blink_left: String,
    /// Morph target driven for the right eye blink.
    pub blink_right: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            core: Config::default(),
            default_cue_weight: 0.9,
            blink_left: "eyeBlinkLeft".to_string(),
            blink_right: "eyeBlinkRight".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(text: &str) -> Result<Self, SessionError> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.core.validate()?;
        Ok(cfg)
    }
}
