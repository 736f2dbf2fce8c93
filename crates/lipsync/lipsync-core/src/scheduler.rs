//! Viseme event scheduler.
//!
//! Holds a start-ordered backlog of pending events and at most one active event
//! per channel. Once per display frame, [`Scheduler::tick`] reads the clock,
//! activates due events (last activation wins per channel), writes the weight
//! of every active event, and zeroes and drops the expired ones. When both sets
//! run empty the sink is cleared so nothing from a finished utterance lingers.
//!
//! The handle is cheap to clone. `enqueue`, `trigger` and `clear` may run on a
//! control thread while `tick` runs on the frame thread; one mutex guards the
//! queue, the active set and the sink. Triggered events are deactivated by a
//! deferred job that only acts if the channel still holds the event it started.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::Config;
use crate::event::{seconds_to_samples, VisemeEvent};
use crate::ids::{EventId, IdAllocator};
use crate::sink::{ChannelIndex, WeightSink};
use crate::timer::{DeferredRunner, ThreadTimer};

/// One sink write made by `tick`, recorded while the write log is enabled.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WriteRecord {
    /// Clock position (samples) of the tick that made the write.
    pub at: i64,
    pub channel: ChannelIndex,
    pub weight: f32,
}

#[derive(Copy, Clone, Debug)]
struct ActiveEvent {
    id: EventId,
    event: VisemeEvent,
}

struct SchedulerState<S> {
    pending: VecDeque<VisemeEvent>,
    active: IndexMap<ChannelIndex, ActiveEvent>,
    sink: S,
    ids: IdAllocator,
    last_now: Option<i64>,
    write_log: Option<Vec<WriteRecord>>,
}

impl<S: WeightSink> SchedulerState<S> {
    fn new(sink: S) -> Self {
        Self {
            pending: VecDeque::new(),
            active: IndexMap::new(),
            sink,
            ids: IdAllocator::new(),
            last_now: None,
            write_log: None,
        }
    }

    fn enqueue(&mut self, batch: &[VisemeEvent]) {
        self.pending.extend(batch.iter().copied());
        // Stable: equal starts keep insertion order, within and across batches.
        self.pending.make_contiguous().sort_by_key(|e| e.start);
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.active.clear();
        self.sink.zero_all();
    }

    fn advance(&mut self, now: i64) {
        if let Some(prev) = self.last_now {
            if now < prev {
                debug!("clock went back from {prev} to {now}; continuing on the new timeline");
            }
        }
        self.last_now = Some(now);

        while self.pending.front().is_some_and(|e| e.start <= now) {
            let Some(event) = self.pending.pop_front() else {
                break;
            };
            let id = self.ids.alloc_event();
            trace!(
                "activate ch={} [{}, {}) w={} at {now}",
                event.channel,
                event.start,
                event.end,
                event.weight
            );
            // Replaces whatever was active on this channel, without an intermediate zero.
            // The replacement moves to the back so drive order stays activation order.
            self.active.shift_remove(&event.channel);
            self.active.insert(event.channel, ActiveEvent { id, event });
        }

        let Self {
            active,
            sink,
            write_log,
            ..
        } = self;
        active.retain(|&channel, entry| {
            let expired = entry.event.is_expired_at(now);
            let weight = if expired { 0.0 } else { entry.event.weight };
            sink.set_weight(channel, weight);
            if let Some(log) = write_log.as_mut() {
                log.push(WriteRecord {
                    at: now,
                    channel,
                    weight,
                });
            }
            if expired {
                trace!("expire ch={channel} at {now}");
            }
            !expired
        });

        if self.pending.is_empty() && self.active.is_empty() {
            self.clear();
        }
    }

    fn activate_now(&mut self, event: VisemeEvent) -> EventId {
        let id = self.ids.alloc_event();
        self.active.shift_remove(&event.channel);
        self.active.insert(event.channel, ActiveEvent { id, event });
        self.sink.set_weight(event.channel, event.weight);
        id
    }

    /// Compare-and-clear: only drops the channel if it still runs `id`.
    fn deactivate(&mut self, channel: ChannelIndex, id: EventId) -> bool {
        match self.active.get(&channel) {
            Some(entry) if entry.id == id => {
                self.active.shift_remove(&channel);
                self.sink.set_weight(channel, 0.0);
                true
            }
            _ => false,
        }
    }
}

/// Shared handle to a viseme scheduler writing into sink `S`.
pub struct Scheduler<S> {
    state: Arc<Mutex<SchedulerState<S>>>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn DeferredRunner>,
    trigger_weight: f32,
}

impl<S> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            timer: Arc::clone(&self.timer),
            trigger_weight: self.trigger_weight,
        }
    }
}

impl<S> fmt::Debug for Scheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("sample_rate", &self.clock.sample_rate())
            .field("trigger_weight", &self.trigger_weight)
            .finish_non_exhaustive()
    }
}

impl<S: WeightSink + Send + 'static> Scheduler<S> {
    /// Create a scheduler reading `clock` and writing into `sink`.
    /// Triggered events are deactivated on a background thread timer.
    pub fn new(clock: Arc<dyn Clock>, sink: S) -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState::new(sink))),
            clock,
            timer: Arc::new(ThreadTimer),
            trigger_weight: Config::default().trigger_weight,
        }
    }

    /// Replace the runner used for deferred trigger deactivation.
    pub fn with_timer(mut self, timer: Arc<dyn DeferredRunner>) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_config(mut self, cfg: &Config) -> Self {
        self.trigger_weight = cfg.trigger_weight;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState<S>> {
        // A panicking sink must not wedge the frame loop.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn sample_rate(&self) -> f64 {
        self.clock.sample_rate()
    }

    /// Append a batch and re-sort the backlog by start. Empty batches are ignored.
    pub fn enqueue(&self, batch: &[VisemeEvent]) {
        if batch.is_empty() {
            return;
        }
        let mut st = self.lock();
        st.enqueue(batch);
        debug!(
            "enqueued {} viseme events ({} pending)",
            batch.len(),
            st.pending.len()
        );
    }

    /// Per-frame step against the current clock position.
    pub fn tick(&self) {
        let now = self.clock.now_samples();
        self.lock().advance(now);
    }

    /// Drop all pending and active events and zero every channel of the sink.
    pub fn clear(&self) {
        self.lock().clear();
        debug!("scheduler cleared");
    }

    /// Drive `channel` at `weight` right now for `duration_secs` of wall time,
    /// bypassing the queue. The deactivation is deferred to the timer and is
    /// skipped if the channel has been cleared or re-driven in the meantime.
    /// A duration too long for a `Duration` holds the channel until it is cleared.
    pub fn trigger(&self, channel: ChannelIndex, duration_secs: f64, weight: f32) -> EventId {
        let now = self.clock.now_samples();
        let span = seconds_to_samples(duration_secs.max(0.0), self.clock.sample_rate());
        let id = self.lock().activate_now(VisemeEvent::new(
            channel,
            now,
            now.saturating_add(span),
            weight,
        ));
        debug!("triggered ch={channel} w={weight} for {duration_secs}s ({id:?})");

        let state: Weak<Mutex<SchedulerState<S>>> = Arc::downgrade(&self.state);
        // Too long to represent means held until cleared; NaN and negatives release at once.
        let delay = Duration::try_from_secs_f64(duration_secs).unwrap_or(if duration_secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        });
        self.timer.run_after(
            delay,
            Box::new(move || {
                let Some(state) = state.upgrade() else {
                    return;
                };
                let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
                if !st.deactivate(channel, id) {
                    trace!("stale deactivation for ch={channel} ({id:?}) skipped");
                }
            }),
        );
        id
    }

    /// `trigger` with the configured default weight.
    pub fn trigger_default(&self, channel: ChannelIndex, duration_secs: f64) -> EventId {
        self.trigger(channel, duration_secs, self.trigger_weight)
    }

    /// Start (or stop) recording `tick` writes. Either way the log is emptied.
    pub fn enable_log(&self, on: bool) {
        self.lock().write_log = on.then(Vec::new);
    }

    pub fn fetch_log(&self) -> Vec<WriteRecord> {
        self.lock().write_log.clone().unwrap_or_default()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn active_len(&self) -> usize {
        self.lock().active.len()
    }

    /// True when nothing is pending or active.
    pub fn is_idle(&self) -> bool {
        let st = self.lock();
        st.pending.is_empty() && st.active.is_empty()
    }

    /// Start positions of the backlog, in dispatch order.
    pub fn pending_starts(&self) -> Vec<i64> {
        self.lock().pending.iter().map(|e| e.start).collect()
    }

    /// Channels with an active event, in activation order.
    pub fn active_channels(&self) -> Vec<ChannelIndex> {
        self.lock().active.keys().copied().collect()
    }

    pub fn active_event(&self, channel: ChannelIndex) -> Option<(EventId, VisemeEvent)> {
        self.lock()
            .active
            .get(&channel)
            .map(|entry| (entry.id, entry.event))
    }

    /// Run `f` with shared access to the sink.
    pub fn with_sink<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock().sink)
    }
}
