//! Core configuration for lipsync-core.

use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating a [`Config`].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sample rate must be positive and finite, got {0}")]
    SampleRate(f64),

    #[error("blink speed must be positive and finite, got {0}")]
    BlinkSpeed(f32),

    #[error("blink wait range [{min}, {max}] is invalid")]
    BlinkWait { min: f64, max: f64 },
}

/// Tunables for the scheduler, free-running clock and blink controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sample rate used by the free-running (no audio file) clock.
    pub free_running_sample_rate: f64,
    /// Weight used by `trigger` when the caller does not supply one.
    pub trigger_weight: f32,
    pub blink: BlinkConfig,
}

/// Blink timing. Defaults give a quick close/open roughly every three seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Phase units per second (higher is faster).
    pub speed: f32,
    /// Lower bound of the pause between blinks, in seconds.
    pub wait_min: f64,
    /// Upper bound of the pause between blinks, in seconds.
    pub wait_max: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            free_running_sample_rate: 44_100.0,
            trigger_weight: 0.8,
            blink: BlinkConfig::default(),
        }
    }
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            speed: 7.5,
            wait_min: 2.5,
            wait_max: 4.0,
        }
    }
}

impl Config {
    /// Parse and validate a JSON config. Missing fields fall back to defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.free_running_sample_rate.is_finite() && self.free_running_sample_rate > 0.0) {
            return Err(ConfigError::SampleRate(self.free_running_sample_rate));
        }
        self.blink.validate()
    }
}

impl BlinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(ConfigError::BlinkSpeed(self.speed));
        }
        let ok = self.wait_min.is_finite()
            && self.wait_max.is_finite()
            && self.wait_min >= 0.0
            && self.wait_min <= self.wait_max;
        if !ok {
            return Err(ConfigError::BlinkWait {
                min: self.wait_min,
                max: self.wait_max,
            });
        }
        Ok(())
    }
}
