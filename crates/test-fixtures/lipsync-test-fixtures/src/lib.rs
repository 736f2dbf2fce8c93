//! Shared fixtures and test doubles for the lipsync crates.
//!
//! JSON fixtures live under `fixtures/` at the workspace root and are indexed by
//! `fixtures/manifest.json`. The doubles give tests full control over time:
//! a clock that only moves when told to, a deferred runner that only fires
//! when told to, and a sink that remembers every write.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use lipsync_core::{ChannelIndex, Clock, DeferredRunner, Job, TimeSource, WeightSink};

/// `fixtures/manifest.json`: fixture name to path (relative to `fixtures/`) for
/// each kind. Cue lists use the host `{id, startSec, endSec, weight?}` format,
/// rigs are `RigSpec` JSON, configs are `SessionConfig` JSON.
static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../../../fixtures/manifest.json"))
        .expect("fixtures/manifest.json should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    cues: HashMap<String, String>,
    rigs: HashMap<String, String>,
    configs: HashMap<String, String>,
}

fn fixture_file(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../../fixtures")
        .join(rel)
}

fn entry<'a>(table: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    table
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("no {kind} fixture named '{name}' in manifest"))
}

fn read_fixture(rel: &str) -> Result<String> {
    let file = fixture_file(rel);
    fs::read_to_string(&file).with_context(|| format!("reading fixture {}", file.display()))
}

fn parse_fixture<T: DeserializeOwned>(rel: &str) -> Result<T> {
    serde_json::from_str(&read_fixture(rel)?).with_context(|| format!("parsing fixture {rel}"))
}

macro_rules! fixture_kind {
    ($module:ident, $field:ident, $kind:literal) => {
        pub mod $module {
            use super::*;

            pub fn keys() -> Vec<String> {
                MANIFEST.$field.keys().cloned().collect()
            }

            /// Raw JSON text of the named fixture.
            pub fn json(name: &str) -> Result<String> {
                read_fixture(entry(&MANIFEST.$field, $kind, name)?)
            }

            pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
                parse_fixture(entry(&MANIFEST.$field, $kind, name)?)
            }

            pub fn path(name: &str) -> Result<PathBuf> {
                Ok(fixture_file(entry(&MANIFEST.$field, $kind, name)?))
            }
        }
    };
}

fixture_kind!(cues, cues, "cue list");
fixture_kind!(rigs, rigs, "rig");
fixture_kind!(configs, configs, "config");

/// Sink that keeps current weights and the full write history.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub weights: Vec<f32>,
    pub writes: Vec<(ChannelIndex, f32)>,
}

impl RecordingSink {
    pub fn new(count: usize) -> Self {
        Self {
            weights: vec![0.0; count],
            writes: Vec::new(),
        }
    }

    pub fn weight(&self, index: ChannelIndex) -> f32 {
        self.weights[index]
    }

    pub fn all_zero(&self) -> bool {
        self.weights.iter().all(|w| *w == 0.0)
    }

    /// Writes recorded for one channel, oldest first.
    pub fn writes_to(&self, index: ChannelIndex) -> Vec<f32> {
        self.writes
            .iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, w)| *w)
            .collect()
    }
}

impl WeightSink for RecordingSink {
    fn target_count(&self) -> usize {
        self.weights.len()
    }

    fn set_weight(&mut self, index: ChannelIndex, weight: f32) {
        if let Some(slot) = self.weights.get_mut(index) {
            *slot = weight;
            self.writes.push((index, weight));
        }
    }
}

/// Clock that only moves when the test moves it.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
    sample_rate: f64,
}

impl ManualClock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            now: AtomicI64::new(0),
            sample_rate,
        }
    }

    pub fn set(&self, samples: i64) {
        self.now.store(samples, Ordering::SeqCst);
    }

    pub fn advance(&self, samples: i64) {
        self.now.fetch_add(samples, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn now_samples(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Deferred runner that holds jobs until the test fires them.
#[derive(Default)]
pub struct ManualTimer {
    jobs: Mutex<Vec<(Duration, Job)>>,
}

impl std::fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTimer")
            .field("pending", &self.pending())
            .finish()
    }
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Delays of the jobs still waiting, in scheduling order.
    pub fn delays(&self) -> Vec<Duration> {
        self.jobs.lock().unwrap().iter().map(|(d, _)| *d).collect()
    }

    /// Run every held job in scheduling order. Returns how many ran.
    pub fn fire_all(&self) -> usize {
        let jobs: Vec<(Duration, Job)> = std::mem::take(&mut *self.jobs.lock().unwrap());
        let n = jobs.len();
        for (_, job) in jobs {
            job();
        }
        n
    }
}

impl DeferredRunner for ManualTimer {
    fn run_after(&self, delay: Duration, job: Job) {
        self.jobs.lock().unwrap().push((delay, job));
    }
}

/// Settable [`TimeSource`] in seconds.
#[derive(Debug, Default)]
pub struct ManualTime {
    bits: AtomicU64,
}

impl ManualTime {
    pub fn new(secs: f64) -> Self {
        Self {
            bits: AtomicU64::new(secs.to_bits()),
        }
    }

    pub fn set(&self, secs: f64) {
        self.bits.store(secs.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        self.set(self.now_secs() + secs);
    }
}

impl TimeSource for ManualTime {
    fn now_secs(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
