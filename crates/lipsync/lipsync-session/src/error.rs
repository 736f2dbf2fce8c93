//! Error types for session setup and host-facing lookups.

use lipsync_core::ConfigError;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum SessionError {
    /// The renderable exposes no morph targets at all.
    #[error("rig '{rig}' has no morph targets")]
    NoMorphTargets { rig: String },

    /// A target name did not resolve to a channel on the current rig.
    #[error("unknown morph target: {name}")]
    UnknownTarget { name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    /// Error category for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoMorphTargets { .. } => "setup",
            Self::UnknownTarget { .. } => "lookup",
            Self::Config(_) => "config",
            Self::Json(_) => "serialization",
        }
    }
}
