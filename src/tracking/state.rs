//! Per-tick tracking state.

/// Outcome of a single tracker tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    /// Nothing to compare against yet: first frame, after a reset, after a
    /// frame-size change, or no usable input this tick.
    #[default]
    NoPriorFrame,
    /// Input was usable but confidence has not crossed the tracking threshold.
    FeaturesDetected,
    /// Confidence is above the tracking threshold.
    Tracked,
    /// This tick failed (too few matches, rejected fit, no hit, bad fix) and
    /// confidence is at or below the threshold.
    LostTrack,
}

impl TrackingState {
    /// Classify a tick from whether it succeeded and whether the backend is
    /// currently confident.
    pub fn from_tick(succeeded: bool, is_tracking: bool) -> Self {
        match (is_tracking, succeeded) {
            (true, _) => Self::Tracked,
            (false, true) => Self::FeaturesDetected,
            (false, false) => Self::LostTrack,
        }
    }
}
