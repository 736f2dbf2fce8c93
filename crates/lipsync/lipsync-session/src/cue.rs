//! Host-facing viseme cues.
//!
//! Producers hand over `{id, startSec, endSec, weight?}` records with target
//! names and times in seconds. They become [`VisemeEvent`]s once the names are
//! resolved against the rig and the times scaled by the clock's sample rate.

use lipsync_core::{TargetResolver, VisemeEvent};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisemeCue {
    pub id: String,
    pub start_sec: f64,
    pub end_sec: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

impl VisemeCue {
    pub fn new(id: impl Into<String>, start_sec: f64, end_sec: f64) -> Self {
        Self {
            id: id.into(),
            start_sec,
            end_sec,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// `None` when the id is not a target on this rig.
    pub fn to_event(
        &self,
        resolver: &dyn TargetResolver,
        sample_rate: f64,
        default_weight: f32,
    ) -> Option<VisemeEvent> {
        let channel = resolver.resolve(&self.id)?;
        Some(VisemeEvent::from_seconds(
            channel,
            self.start_sec,
            self.end_sec,
            self.weight.unwrap_or(default_weight),
            sample_rate,
        ))
    }
}

/// Cues converted to events, plus the ids that did not resolve.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CueBatch {
    pub events: Vec<VisemeEvent>,
    pub unresolved: Vec<String>,
}

pub fn cues_to_events(
    cues: &[VisemeCue],
    resolver: &dyn TargetResolver,
    sample_rate: f64,
    default_weight: f32,
) -> CueBatch {
    let mut batch = CueBatch::default();
    for cue in cues {
        match cue.to_event(resolver, sample_rate, default_weight) {
            Some(event) => batch.events.push(event),
            None => batch.unresolved.push(cue.id.clone()),
        }
    }
    batch
}

pub fn parse_cues(text: &str) -> Result<Vec<VisemeCue>, SessionError> {
    Ok(serde_json::from_str(text)?)
}
