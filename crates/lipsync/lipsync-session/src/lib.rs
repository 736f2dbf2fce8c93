//! Lipsync Session
//!
//! Host-side layer over `lipsync-core`: a named morph rig, translation of
//! `{id, startSec, endSec, weight}` cues into scheduled events, and the
//! per-frame loop that ticks visemes and blinks and composites them onto the rig.

pub mod config;
pub mod cue;
pub mod error;
pub mod rig;
pub mod session;

pub use config::SessionConfig;
pub use cue::{cues_to_events, parse_cues, CueBatch, VisemeCue};
pub use error::SessionError;
pub use rig::{MorphRig, RigSpec};
pub use session::AvatarSession;

pub use lipsync_core::{AudioClock, Component, EventId, PlaybackClock, PlaybackCursor};
