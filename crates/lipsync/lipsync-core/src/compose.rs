//! Layered weight composition.
//!
//! Three independent weight vectors (viseme, blink, emotion) share the index
//! space of one sink and are folded into it on [`Compositor::apply`]. The
//! default fold is `max`: the sources are overlays on a 0..1 scale, and summing
//! them would push a target past its sculpted extreme.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::sink::{ChannelIndex, WeightSink};

/// Logical source of a weight.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Viseme,
    Blink,
    Emotion,
}

/// The three component vectors, always the same length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentWeights {
    pub viseme: Vec<f32>,
    pub blink: Vec<f32>,
    pub emotion: Vec<f32>,
}

impl ComponentWeights {
    pub fn zeros(len: usize) -> Self {
        Self {
            viseme: vec![0.0; len],
            blink: vec![0.0; len],
            emotion: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.viseme.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viseme.is_empty()
    }

    pub fn get(&self, component: Component) -> &[f32] {
        match component {
            Component::Viseme => &self.viseme,
            Component::Blink => &self.blink,
            Component::Emotion => &self.emotion,
        }
    }

    fn get_mut(&mut self, component: Component) -> &mut Vec<f32> {
        match component {
            Component::Viseme => &mut self.viseme,
            Component::Blink => &mut self.blink,
            Component::Emotion => &mut self.emotion,
        }
    }
}

/// Default combination rule.
#[inline]
pub fn combine_max(a: f32, b: f32) -> f32 {
    a.max(b)
}

/// Owns the output sink and the per-component weights feeding it.
#[derive(Debug)]
pub struct Compositor<S> {
    sink: S,
    layers: ComponentWeights,
}

impl<S: WeightSink> Compositor<S> {
    pub fn new(sink: S) -> Self {
        let layers = ComponentWeights::zeros(sink.target_count());
        Self { sink, layers }
    }

    /// Wrap into the shared form used by [`ComponentSink`].
    pub fn into_shared(self) -> SharedCompositor<S> {
        Arc::new(Mutex::new(self))
    }

    pub fn target_count(&self) -> usize {
        self.sink.target_count()
    }

    /// Set one entry of one component. Out-of-range indices are ignored.
    pub fn set_component(&mut self, component: Component, index: ChannelIndex, weight: f32) {
        if let Some(slot) = self.layers.get_mut(component).get_mut(index) {
            *slot = weight;
        }
    }

    /// Replace a whole component vector.
    ///
    /// # Panics
    /// If `weights.len()` differs from the sink's target count.
    pub fn set_component_weights(&mut self, component: Component, weights: Vec<f32>) {
        assert_eq!(
            weights.len(),
            self.target_count(),
            "component size mismatch for {component:?}"
        );
        *self.layers.get_mut(component) = weights;
    }

    pub fn component(&self, component: Component) -> &[f32] {
        self.layers.get(component)
    }

    pub fn layers(&self) -> &ComponentWeights {
        &self.layers
    }

    /// Write `max(viseme, max(blink, emotion))` for every channel.
    pub fn apply(&mut self) {
        self.apply_with(combine_max);
    }

    /// Write `combine(viseme[i], combine(blink[i], emotion[i]))` for every channel.
    pub fn apply_with(&mut self, combine: impl Fn(f32, f32) -> f32) {
        let ComponentWeights {
            viseme,
            blink,
            emotion,
        } = &self.layers;
        let at = |v: &[f32], i: usize| v.get(i).copied().unwrap_or(0.0);
        for i in 0..self.sink.target_count() {
            let w = combine(at(viseme, i), combine(at(blink, i), at(emotion, i)));
            self.sink.set_weight(i, w);
        }
    }

    /// Zero the sink and every component, resizing the components to the
    /// sink's current target count.
    pub fn reset_all(&mut self) {
        self.sink.zero_all();
        self.layers = ComponentWeights::zeros(self.sink.target_count());
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Swap in a new sink (e.g. another avatar), returning the old one.
    /// Components are reset to the new sink's size.
    pub fn replace_sink(&mut self, sink: S) -> S {
        let old = std::mem::replace(&mut self.sink, sink);
        self.reset_all();
        old
    }
}

/// Compositor shared between the scheduler, the blink controller and the frame loop.
pub type SharedCompositor<S> = Arc<Mutex<Compositor<S>>>;

/// A [`WeightSink`] view writing into one component of a shared compositor.
#[derive(Debug)]
pub struct ComponentSink<S> {
    compositor: SharedCompositor<S>,
    component: Component,
}

impl<S> Clone for ComponentSink<S> {
    fn clone(&self) -> Self {
        Self {
            compositor: Arc::clone(&self.compositor),
            component: self.component,
        }
    }
}

impl<S: WeightSink> ComponentSink<S> {
    pub fn new(compositor: SharedCompositor<S>, component: Component) -> Self {
        Self {
            compositor,
            component,
        }
    }

    pub fn component(&self) -> Component {
        self.component
    }

    fn lock(&self) -> MutexGuard<'_, Compositor<S>> {
        self.compositor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: WeightSink> WeightSink for ComponentSink<S> {
    fn target_count(&self) -> usize {
        self.lock().target_count()
    }

    fn set_weight(&mut self, index: ChannelIndex, weight: f32) {
        self.lock().set_component(self.component, index, weight);
    }

    fn zero_all(&mut self) {
        let mut compositor = self.lock();
        compositor.layers.get_mut(self.component).fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_apply_takes_max() {
        let mut c = Compositor::new(vec![0.0f32; 4]);
        c.set_component(Component::Viseme, 2, 0.3);
        c.set_component(Component::Blink, 2, 0.8);
        c.set_component(Component::Emotion, 2, 0.0);
        c.apply();
        assert_eq!(c.sink()[2], 0.8);
    }

    #[test]
    fn set_component_ignores_out_of_range() {
        let mut c = Compositor::new(vec![0.0f32; 2]);
        c.set_component(Component::Emotion, 5, 1.0);
        assert_eq!(c.component(Component::Emotion), &[0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "component size mismatch")]
    fn full_vector_length_must_match() {
        let mut c = Compositor::new(vec![0.0f32; 3]);
        c.set_component_weights(Component::Viseme, vec![1.0, 1.0]);
    }

    #[test]
    fn component_sink_zero_all_only_touches_its_component() {
        let shared = Compositor::new(vec![0.0f32; 2]).into_shared();
        let mut visemes = ComponentSink::new(shared.clone(), Component::Viseme);
        let mut blink = ComponentSink::new(shared.clone(), Component::Blink);
        visemes.set_weight(0, 0.4);
        blink.set_weight(0, 0.6);
        visemes.zero_all();
        let c = shared.lock().unwrap();
        assert_eq!(c.component(Component::Viseme), &[0.0, 0.0]);
        assert_eq!(c.component(Component::Blink), &[0.6, 0.0]);
    }
}
