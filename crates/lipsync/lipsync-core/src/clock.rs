//! Sample clocks.
//!
//! Two sources drive the scheduler:
//! - [`PlaybackClock`]: reads the render position an audio thread publishes
//!   through a [`PlaybackCursor`]. Reports `0` until rendering has started, and
//!   goes back to `0` when playback is restarted.
//! - [`FreeRunningClock`]: wall-clock timeline for speech that has no audio
//!   file behind it. `reset()` moves its origin to "now".
//!
//! Neither ever fails or blocks; both are safe to read from the tick thread
//! while another thread updates them.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonically non-decreasing sample position plus the rate it ticks at.
pub trait Clock: Send + Sync {
    fn sample_rate(&self) -> f64;
    fn now_samples(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn sample_rate(&self) -> f64 {
        (**self).sample_rate()
    }

    fn now_samples(&self) -> i64 {
        (**self).now_samples()
    }
}

/// Seconds on a monotonic timeline with an arbitrary origin.
pub trait TimeSource: Send + Sync {
    fn now_secs(&self) -> f64;
}

/// [`TimeSource`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

const NOT_RENDERING: i64 = i64::MIN;

/// Render position shared between the audio thread (writer) and the clock (reader).
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    position: Arc<AtomicI64>,
}

impl Default for PlaybackCursor {
    fn default() -> Self {
        Self {
            position: Arc::new(AtomicI64::new(NOT_RENDERING)),
        }
    }
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a new buffer: position becomes sample 0.
    pub fn begin(&self) {
        self.position.store(0, Ordering::Release);
    }

    /// Add rendered frames. Ignored while not rendering.
    pub fn advance(&self, frames: u64) {
        let step = i64::try_from(frames).unwrap_or(i64::MAX);
        let _ = self
            .position
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pos| {
                (pos != NOT_RENDERING).then(|| pos.saturating_add(step))
            });
    }

    /// Publish an absolute render position (negative values clamp to 0).
    pub fn set(&self, sample: i64) {
        self.position.store(sample.max(0), Ordering::Release);
    }

    /// Playback stopped; the clock reads `0` until the next `begin`.
    pub fn stop(&self) {
        self.position.store(NOT_RENDERING, Ordering::Release);
    }

    /// Current render position, or `None` when nothing has rendered yet.
    pub fn position(&self) -> Option<i64> {
        match self.position.load(Ordering::Acquire) {
            NOT_RENDERING => None,
            pos => Some(pos),
        }
    }
}

/// Clock derived from actual audio playback progress.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    cursor: PlaybackCursor,
    sample_rate: f64,
}

impl PlaybackClock {
    pub fn new(cursor: PlaybackCursor, sample_rate: f64) -> Self {
        Self {
            cursor,
            sample_rate,
        }
    }

    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }
}

impl Clock for PlaybackClock {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn now_samples(&self) -> i64 {
        self.cursor.position().unwrap_or(0)
    }
}

/// Clock derived from wall time since construction (or the last `reset`).
pub struct FreeRunningClock {
    time: Arc<dyn TimeSource>,
    start_bits: AtomicU64,
    sample_rate: f64,
}

impl fmt::Debug for FreeRunningClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeRunningClock")
            .field("start", &self.start_secs())
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

impl FreeRunningClock {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_time_source(Arc::new(MonotonicTime::new()), sample_rate)
    }

    pub fn with_time_source(time: Arc<dyn TimeSource>, sample_rate: f64) -> Self {
        let start = time.now_secs();
        Self {
            time,
            start_bits: AtomicU64::new(start.to_bits()),
            sample_rate,
        }
    }

    /// Restart the timeline at the current wall time.
    pub fn reset(&self) {
        let now = self.time.now_secs();
        self.start_bits.store(now.to_bits(), Ordering::Release);
        log::debug!("free-running clock reset at {now:.4}s");
    }

    fn start_secs(&self) -> f64 {
        f64::from_bits(self.start_bits.load(Ordering::Acquire))
    }
}

impl Clock for FreeRunningClock {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn now_samples(&self) -> i64 {
        let elapsed = (self.time.now_secs() - self.start_secs()).max(0.0);
        (elapsed * self.sample_rate).floor() as i64
    }
}

/// The two clock variants behind one type.
#[derive(Debug)]
pub enum AudioClock {
    Playback(PlaybackClock),
    FreeRunning(FreeRunningClock),
}

impl AudioClock {
    /// Reset the free-running timeline; playback clocks follow their cursor and ignore this.
    pub fn reset(&self) {
        if let AudioClock::FreeRunning(clock) = self {
            clock.reset();
        }
    }
}

impl Clock for AudioClock {
    fn sample_rate(&self) -> f64 {
        match self {
            AudioClock::Playback(c) => c.sample_rate(),
            AudioClock::FreeRunning(c) => c.sample_rate(),
        }
    }

    fn now_samples(&self) -> i64 {
        match self {
            AudioClock::Playback(c) => c.now_samples(),
            AudioClock::FreeRunning(c) => c.now_samples(),
        }
    }
}

impl From<PlaybackClock> for AudioClock {
    fn from(c: PlaybackClock) -> Self {
        AudioClock::Playback(c)
    }
}

impl From<FreeRunningClock> for AudioClock {
    fn from(c: FreeRunningClock) -> Self {
        AudioClock::FreeRunning(c)
    }
}
