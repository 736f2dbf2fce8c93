//! Channel-name resolution.
//!
//! Viseme producers speak in target names ("viseme_aa", "eyeBlinkLeft"); the
//! scheduler speaks in indices. Names are resolved once at setup and the
//! indices trusted afterwards.

use hashbrown::HashMap;

use crate::sink::ChannelIndex;

/// Resolves a morph-target name to its channel index.
pub trait TargetResolver {
    fn resolve(&self, name: &str) -> Option<ChannelIndex>;
}

/// Name → index table built from an ordered target-name list.
#[derive(Clone, Debug, Default)]
pub struct ChannelMap {
    by_name: HashMap<String, ChannelIndex>,
}

impl ChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index each name by position. Duplicate names keep their first index.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for (idx, name) in names.into_iter().enumerate() {
            map.by_name.entry(name.into()).or_insert(idx);
        }
        map
    }

    pub fn insert(&mut self, name: impl Into<String>, index: ChannelIndex) {
        self.by_name.insert(name.into(), index);
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl TargetResolver for ChannelMap {
    fn resolve(&self, name: &str) -> Option<ChannelIndex> {
        self.by_name.get(name).copied()
    }
}
