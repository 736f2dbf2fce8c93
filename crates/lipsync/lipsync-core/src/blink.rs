//! Autonomous periodic blinking.
//!
//! `Waiting → Closing (phase 0→1) → Opening (phase 1→0) → Waiting`, with the
//! next blink drawn uniformly from the configured wait range as soon as the
//! eyes are open again. Output is the smoothstep of the phase. Runs on display
//! time, not on the audio clock.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::BlinkConfig;
use crate::sink::{ChannelIndex, WeightSink};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlinkDirection {
    Opening,
    Waiting,
    Closing,
}

impl BlinkDirection {
    #[inline]
    fn sign(self) -> f32 {
        match self {
            BlinkDirection::Opening => -1.0,
            BlinkDirection::Waiting => 0.0,
            BlinkDirection::Closing => 1.0,
        }
    }
}

/// `t² (3 − 2t)`.
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

#[derive(Debug)]
pub struct BlinkController {
    left: Option<ChannelIndex>,
    right: Option<ChannelIndex>,
    /// 0 = open, 1 = closed.
    phase: f32,
    direction: BlinkDirection,
    next_blink_time: f64,
    speed: f32,
    wait_min: f64,
    wait_max: f64,
    rng: StdRng,
}

impl BlinkController {
    /// Bind to the eye channels and schedule the first blink from `now`.
    pub fn new(
        cfg: &BlinkConfig,
        left: Option<ChannelIndex>,
        right: Option<ChannelIndex>,
        now: f64,
    ) -> Self {
        Self::with_rng(cfg, left, right, now, StdRng::from_entropy())
    }

    /// Deterministic variant for tests and replays.
    pub fn with_seed(
        cfg: &BlinkConfig,
        left: Option<ChannelIndex>,
        right: Option<ChannelIndex>,
        now: f64,
        seed: u64,
    ) -> Self {
        Self::with_rng(cfg, left, right, now, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        cfg: &BlinkConfig,
        left: Option<ChannelIndex>,
        right: Option<ChannelIndex>,
        now: f64,
        rng: StdRng,
    ) -> Self {
        let mut ctl = Self {
            left,
            right,
            phase: 0.0,
            direction: BlinkDirection::Waiting,
            next_blink_time: 0.0,
            speed: cfg.speed,
            wait_min: 0.0,
            wait_max: 0.0,
            rng,
        };
        ctl.set_wait_range(cfg.wait_min, cfg.wait_max);
        ctl.schedule_next_blink(now);
        ctl
    }

    /// Advance by `dt` seconds at display time `now` and write the eased
    /// phase to whichever eye channels are bound. Returns the eased value.
    pub fn tick(&mut self, dt: f32, now: f64, sink: &mut dyn WeightSink) -> f32 {
        match self.direction {
            BlinkDirection::Waiting => {
                if now >= self.next_blink_time {
                    self.direction = BlinkDirection::Closing;
                    self.phase = 0.0;
                }
            }
            direction => {
                self.phase += direction.sign() * self.speed * dt;
                if self.phase >= 1.0 {
                    self.phase = 1.0;
                    self.direction = BlinkDirection::Opening;
                } else if self.phase <= 0.0 {
                    self.schedule_next_blink(now);
                }
            }
        }

        let eased = smoothstep(self.phase);
        for idx in [self.left, self.right].into_iter().flatten() {
            sink.set_weight(idx, eased);
        }
        eased
    }

    fn schedule_next_blink(&mut self, now: f64) {
        let wait = if self.wait_max > self.wait_min {
            self.rng.gen_range(self.wait_min..=self.wait_max)
        } else {
            self.wait_min
        };
        self.next_blink_time = now + wait;
        self.phase = 0.0;
        self.direction = BlinkDirection::Waiting;
        log::trace!("next blink at {:.3}s (in {wait:.3}s)", self.next_blink_time);
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn eased(&self) -> f32 {
        smoothstep(self.phase)
    }

    pub fn direction(&self) -> BlinkDirection {
        self.direction
    }

    pub fn next_blink_time(&self) -> f64 {
        self.next_blink_time
    }

    pub fn targets(&self) -> (Option<ChannelIndex>, Option<ChannelIndex>) {
        (self.left, self.right)
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn wait_range(&self) -> (f64, f64) {
        (self.wait_min, self.wait_max)
    }

    /// Takes effect at the next scheduling. Bounds are reordered if given backwards.
    pub fn set_wait_range(&mut self, min: f64, max: f64) {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.wait_min = lo.max(0.0);
        self.wait_max = hi.max(self.wait_min);
    }
}
