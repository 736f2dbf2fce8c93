//! Weight sink contract.
//!
//! A sink is whatever finally owns the blend-shape weights (a morph-target set
//! on a loaded avatar, a component vector of the compositor, a test recorder).

/// Index of one morph / blend-shape target.
pub type ChannelIndex = usize;

/// Destination for per-channel weights.
///
/// `set_weight` with an index outside `[0, target_count())` is a no-op.
/// Weights are not clamped here.
pub trait WeightSink {
    fn target_count(&self) -> usize;
    fn set_weight(&mut self, index: ChannelIndex, weight: f32);

    /// Write `0.0` to every channel.
    fn zero_all(&mut self) {
        for i in 0..self.target_count() {
            self.set_weight(i, 0.0);
        }
    }
}

impl<S: WeightSink + ?Sized> WeightSink for Box<S> {
    fn target_count(&self) -> usize {
        (**self).target_count()
    }

    fn set_weight(&mut self, index: ChannelIndex, weight: f32) {
        (**self).set_weight(index, weight);
    }
}

impl<S: WeightSink + ?Sized> WeightSink for &mut S {
    fn target_count(&self) -> usize {
        (**self).target_count()
    }

    fn set_weight(&mut self, index: ChannelIndex, weight: f32) {
        (**self).set_weight(index, weight);
    }
}

/// Plain weight vector; out-of-range writes are dropped.
impl WeightSink for Vec<f32> {
    fn target_count(&self) -> usize {
        self.len()
    }

    fn set_weight(&mut self, index: ChannelIndex, weight: f32) {
        if let Some(slot) = self.get_mut(index) {
            *slot = weight;
        }
    }
}
