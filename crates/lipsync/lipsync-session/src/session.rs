//! Avatar session: one rig, its compositor, and the controllers feeding it.
//!
//! The scheduler writes the viseme component and the blink controller writes
//! the blink component; [`AvatarSession::frame`] ticks both and folds the
//! components into the rig with `max`. Neither controller writes the rig
//! directly, so a viseme and a blink on the same target never clobber each
//! other.

use std::sync::{Arc, MutexGuard, PoisonError};

use lipsync_core::{
    AudioClock, BlinkController, ChannelIndex, Clock, Component, ComponentSink, Compositor,
    DeferredRunner, EventId, FreeRunningClock, Scheduler, SharedCompositor, TargetResolver,
    ThreadTimer, TimeSource, WeightSink,
};
use log::{debug, warn};

use crate::config::SessionConfig;
use crate::cue::{cues_to_events, VisemeCue};
use crate::error::SessionError;

type VisemeScheduler<R> = Scheduler<ComponentSink<R>>;

pub struct AvatarSession<R> {
    config: SessionConfig,
    compositor: SharedCompositor<R>,
    scheduler: Option<VisemeScheduler<R>>,
    bound_clock: Option<Arc<AudioClock>>,
    speech_clock: Arc<AudioClock>,
    blink: Option<BlinkController>,
    blink_sink: ComponentSink<R>,
    timer: Arc<dyn DeferredRunner>,
}

impl<R> std::fmt::Debug for AvatarSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarSession")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .field("blink", &self.blink)
            .finish_non_exhaustive()
    }
}

impl<R> AvatarSession<R>
where
    R: WeightSink + TargetResolver + Send + 'static,
{
    /// Take ownership of `rig`. Blinking starts if the configured eye targets
    /// exist on the rig; `now` is the display time used to schedule the first blink.
    pub fn new(rig: R, config: SessionConfig, now: f64) -> Result<Self, SessionError> {
        config.core.validate()?;
        let compositor = Compositor::new(rig).into_shared();
        let speech_clock = Arc::new(AudioClock::from(FreeRunningClock::new(
            config.core.free_running_sample_rate,
        )));
        let blink_sink = ComponentSink::new(compositor.clone(), Component::Blink);
        let mut session = Self {
            config,
            compositor,
            scheduler: None,
            bound_clock: None,
            speech_clock,
            blink: None,
            blink_sink,
            timer: Arc::new(ThreadTimer),
        };
        session.blink = session.make_blink(now, None);
        Ok(session)
    }

    /// Runner for deferred trigger deactivation (applies to schedulers created afterwards).
    pub fn with_timer(mut self, timer: Arc<dyn DeferredRunner>) -> Self {
        self.timer = timer;
        self
    }

    /// Recreate the blink controller with a fixed seed.
    pub fn with_blink_seed(mut self, seed: u64, now: f64) -> Self {
        self.blink = self.make_blink(now, Some(seed));
        self
    }

    /// Time source for the free-running clock used by [`AvatarSession::speak`].
    pub fn with_speech_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.speech_clock = Arc::new(AudioClock::from(FreeRunningClock::with_time_source(
            time,
            self.config.core.free_running_sample_rate,
        )));
        self
    }

    fn lock(&self) -> MutexGuard<'_, Compositor<R>> {
        self.compositor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, name: &str) -> Option<ChannelIndex> {
        self.lock().sink().resolve(name)
    }

    fn make_blink(&self, now: f64, seed: Option<u64>) -> Option<BlinkController> {
        let left = self.resolve(&self.config.blink_left);
        let right = self.resolve(&self.config.blink_right);
        if left.is_none() {
            warn!("blink target '{}' not on rig", self.config.blink_left);
        }
        if right.is_none() {
            warn!("blink target '{}' not on rig", self.config.blink_right);
        }
        if left.is_none() && right.is_none() {
            return None;
        }
        let cfg = &self.config.core.blink;
        Some(match seed {
            Some(seed) => BlinkController::with_seed(cfg, left, right, now, seed),
            None => BlinkController::new(cfg, left, right, now),
        })
    }

    /// Scheduler bound to `clock`; a different clock replaces the scheduler.
    fn bind(&mut self, clock: &Arc<AudioClock>) -> VisemeScheduler<R> {
        if let (Some(sched), Some(bound)) = (&self.scheduler, &self.bound_clock) {
            if Arc::ptr_eq(bound, clock) {
                return sched.clone();
            }
        }
        if let Some(old) = self.scheduler.take() {
            old.clear();
        }
        let sched = Scheduler::new(
            clock.clone(),
            ComponentSink::new(self.compositor.clone(), Component::Viseme),
        )
        .with_timer(self.timer.clone())
        .with_config(&self.config.core);
        debug!("scheduler bound to clock at {} Hz", clock.sample_rate());
        self.scheduler = Some(sched.clone());
        self.bound_clock = Some(clock.clone());
        sched
    }

    /// Queue cues against an audio clock. Cues whose id is not on the rig are
    /// skipped. Returns the number of events queued.
    pub fn play_visemes(&mut self, clock: Arc<AudioClock>, cues: &[VisemeCue]) -> usize {
        let sched = self.bind(&clock);
        let batch = {
            let compositor = self.lock();
            cues_to_events(
                cues,
                compositor.sink(),
                clock.sample_rate(),
                self.config.default_cue_weight,
            )
        };
        for id in &batch.unresolved {
            warn!("dropping cue for unknown target '{id}'");
        }
        sched.enqueue(&batch.events);
        debug!(
            "play: {} of {} cues queued",
            batch.events.len(),
            cues.len()
        );
        batch.events.len()
    }

    /// Start a new utterance without an audio file: restarts the free-running
    /// clock, drops whatever was still queued, and queues `cues` on it.
    pub fn speak(&mut self, cues: &[VisemeCue]) -> usize {
        let clock = self.speech_clock.clone();
        self.bind(&clock).clear();
        clock.reset();
        self.play_visemes(clock, cues)
    }

    /// Drive one target immediately for `duration_secs`. Without a bound
    /// scheduler, the speech clock is used.
    pub fn trigger_viseme(
        &mut self,
        name: &str,
        duration_secs: f64,
        weight: Option<f32>,
    ) -> Result<EventId, SessionError> {
        let channel = self
            .resolve(name)
            .ok_or_else(|| SessionError::UnknownTarget {
                name: name.to_string(),
            })?;
        let sched = match &self.scheduler {
            Some(sched) => sched.clone(),
            None => {
                let clock = self.speech_clock.clone();
                self.bind(&clock)
            }
        };
        Ok(match weight {
            Some(w) => sched.trigger(channel, duration_secs, w),
            None => sched.trigger_default(channel, duration_secs),
        })
    }

    /// Drop every queued and active viseme and neutralize the mouth.
    /// Serves both the host's "stop" and "reset" commands; audio is the host's to stop.
    pub fn stop(&mut self) {
        if let Some(sched) = &self.scheduler {
            sched.clear();
        }
        debug!("session stopped");
    }

    pub fn set_emotion(&mut self, name: &str, weight: f32) -> Result<(), SessionError> {
        let mut compositor = self.lock();
        let channel =
            compositor
                .sink()
                .resolve(name)
                .ok_or_else(|| SessionError::UnknownTarget {
                    name: name.to_string(),
                })?;
        compositor.set_component(Component::Emotion, channel, weight);
        Ok(())
    }

    /// Replace the whole emotion layer.
    ///
    /// # Panics
    /// If `weights` does not have one entry per rig target.
    pub fn set_emotion_weights(&mut self, weights: Vec<f32>) {
        self.lock()
            .set_component_weights(Component::Emotion, weights);
    }

    pub fn clear_emotion(&mut self) {
        let mut compositor = self.lock();
        let n = compositor.target_count();
        compositor.set_component_weights(Component::Emotion, vec![0.0; n]);
    }

    /// Per display frame: visemes, then blink, then composite into the rig.
    pub fn frame(&mut self, dt: f32, now: f64) {
        if let Some(sched) = &self.scheduler {
            sched.tick();
        }
        if let Some(blink) = self.blink.as_mut() {
            blink.tick(dt, now, &mut self.blink_sink);
        }
        self.lock().apply();
    }

    /// Swap the avatar. Visemes are dropped, weights reset, and the blink
    /// controller re-resolved against the new rig. Returns the previous rig.
    pub fn swap_rig(&mut self, rig: R, now: f64) -> R {
        if let Some(sched) = self.scheduler.take() {
            sched.clear();
        }
        self.bound_clock = None;
        let old = self.lock().replace_sink(rig);
        self.blink = self.make_blink(now, None);
        debug!("rig swapped");
        old
    }

    /// Tear down controllers and zero every weight.
    pub fn dispose(&mut self) {
        if let Some(sched) = self.scheduler.take() {
            sched.clear();
        }
        self.bound_clock = None;
        self.blink = None;
        self.lock().reset_all();
        debug!("session disposed");
    }

    /// Read access to the rig (final composited weights).
    pub fn with_rig<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(self.lock().sink())
    }

    pub fn component(&self, component: Component) -> Vec<f32> {
        self.lock().component(component).to_vec()
    }

    pub fn scheduler(&self) -> Option<&VisemeScheduler<R>> {
        self.scheduler.as_ref()
    }

    pub fn blink(&self) -> Option<&BlinkController> {
        self.blink.as_ref()
    }

    pub fn speech_clock(&self) -> &Arc<AudioClock> {
        &self.speech_clock
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
