//! Lipsync Core (engine-agnostic)
//!
//! Drives facial blend-shape weights for an avatar: timed viseme events are
//! scheduled against an audio sample clock, blinks run on their own timer, and
//! the sources are composited per channel into a single weight sink.
//!
//! Nothing here loads models or decodes audio; hosts supply a [`WeightSink`]
//! for the renderable and a [`Clock`] for the playback timeline.

pub mod binding;
pub mod blink;
pub mod clock;
pub mod compose;
pub mod config;
pub mod event;
pub mod ids;
pub mod scheduler;
pub mod sink;
pub mod timer;

// Re-exports for consumers (hosts and session layers)
pub use binding::{ChannelMap, TargetResolver};
pub use blink::{smoothstep, BlinkController, BlinkDirection};
pub use clock::{
    AudioClock, Clock, FreeRunningClock, MonotonicTime, PlaybackClock, PlaybackCursor, TimeSource,
};
pub use compose::{
    combine_max, Component, ComponentSink, ComponentWeights, Compositor, SharedCompositor,
};
pub use config::{BlinkConfig, Config, ConfigError};
pub use event::{seconds_to_samples, VisemeEvent};
pub use ids::EventId;
pub use scheduler::{Scheduler, WriteRecord};
pub use sink::{ChannelIndex, WeightSink};
pub use timer::{DeferredRunner, Job, ThreadTimer};
