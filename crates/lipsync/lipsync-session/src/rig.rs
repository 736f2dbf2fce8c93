//! Named morph-target set.
//!
//! Stands in for the renderable: an ordered list of blend-shape targets with
//! their current weights, addressable by index (as a [`WeightSink`]) or by name.

use lipsync_core::{ChannelIndex, ChannelMap, TargetResolver, WeightSink};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Serializable description of a rig: a mesh name and its target names in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigSpec {
    pub name: String,
    pub targets: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct MorphRig {
    name: String,
    targets: Vec<String>,
    weights: Vec<f32>,
    channels: ChannelMap,
}

impl MorphRig {
    pub fn new<I, S>(name: impl Into<String>, targets: I) -> Result<Self, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        if targets.is_empty() {
            return Err(SessionError::NoMorphTargets { rig: name });
        }
        let channels = ChannelMap::from_names(targets.iter().cloned());
        log::debug!("rig '{name}' with {} morph targets", targets.len());
        Ok(Self {
            weights: vec![0.0; targets.len()],
            name,
            targets,
            channels,
        })
    }

    pub fn from_spec(spec: RigSpec) -> Result<Self, SessionError> {
        Self::new(spec.name, spec.targets)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SessionError> {
        Self::from_spec(serde_json::from_str(text)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn index_of(&self, name: &str) -> Option<ChannelIndex> {
        self.channels.resolve(name)
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn weight(&self, index: ChannelIndex) -> Option<f32> {
        self.weights.get(index).copied()
    }

    pub fn weight_of(&self, name: &str) -> Option<f32> {
        self.index_of(name).and_then(|i| self.weight(i))
    }
}

impl WeightSink for MorphRig {
    fn target_count(&self) -> usize {
        self.weights.len()
    }

    fn set_weight(&mut self, index: ChannelIndex, weight: f32) {
        if let Some(slot) = self.weights.get_mut(index) {
            *slot = weight;
        }
    }
}

impl TargetResolver for MorphRig {
    fn resolve(&self, name: &str) -> Option<ChannelIndex> {
        self.index_of(name)
    }
}
