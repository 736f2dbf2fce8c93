//! Timed viseme events.

use serde::{Deserialize, Serialize};

use crate::sink::ChannelIndex;

/// A weight held on one channel for the sample window `[start, end)`.
///
/// Times are in samples of the driving clock. `start < end` is expected but
/// not enforced; an empty window activates and expires in the same tick.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisemeEvent {
    pub channel: ChannelIndex,
    pub start: i64,
    pub end: i64,
    pub weight: f32,
}

impl VisemeEvent {
    pub fn new(channel: ChannelIndex, start: i64, end: i64, weight: f32) -> Self {
        Self {
            channel,
            start,
            end,
            weight,
        }
    }

    /// Build an event from a window in seconds, rounding to the nearest sample.
    pub fn from_seconds(
        channel: ChannelIndex,
        start_sec: f64,
        end_sec: f64,
        weight: f32,
        sample_rate: f64,
    ) -> Self {
        Self {
            channel,
            start: seconds_to_samples(start_sec, sample_rate),
            end: seconds_to_samples(end_sec, sample_rate),
            weight,
        }
    }

    #[inline]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.end
    }
}

/// `round(seconds * sample_rate)`.
#[inline]
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> i64 {
    (seconds * sample_rate).round() as i64
}
