//! Rate-limited confidence with an asymmetric ramp.
//!
//! Good ticks add [`CONFIDENCE_GAIN`], bad ticks remove [`CONFIDENCE_DECAY`],
//! and a backend reports tracking only while the value is strictly above
//! [`TRACKING_THRESHOLD`]. One good frame therefore cannot make the indicator
//! pop in, and one bad frame from a well-established plane cannot drop it.

pub const CONFIDENCE_GAIN: f64 = 0.15;
pub const CONFIDENCE_DECAY: f64 = 0.10;
pub const TRACKING_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfidenceRamp {
    value: f64,
}

impl ConfidenceRamp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful tick: `+0.15`, capped at `1.0`.
    pub fn boost(&mut self) -> f64 {
        self.value = (self.value + CONFIDENCE_GAIN).min(1.0);
        self.value
    }

    /// Failed tick: `-0.10`, floored at `0.0`.
    pub fn decay(&mut self) -> f64 {
        self.value = (self.value - CONFIDENCE_DECAY).max(0.0);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_tracking(&self) -> bool {
        self.value > TRACKING_THRESHOLD
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}
