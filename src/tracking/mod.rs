//! Tracking backends: visual plane, platform hit-test and geodetic.
//!
//! Every backend turns one tick of input into a [`TrackingResult`] with the
//! same shape, driven by a confidence ramp:
//! - visual: ORB features, temporal matching, RANSAC homography
//! - hit-test: ranked surface hits from the host session
//! - geodetic: GPS fix and compass heading against a fixed target
//!
//! Exactly one backend is active per session, see [`backend::select_backend`].

pub mod backend;
pub mod confidence;
pub mod geodetic;
pub mod hit_test;
pub mod result;
pub mod state;
pub mod visual;

use opencv::core::Mat;

use crate::error::InitError;

pub use backend::{select_backend, BackendKind, Capabilities, Tracker};
pub use confidence::ConfidenceRamp;
pub use geodetic::GeodeticTracker;
pub use hit_test::{HitTestFrame, HitTestHit, HitTestPlatform, HitTestTracker};
pub use result::{GroundPlaneEstimate, TrackedPointPair, TrackerStats, TrackingPayload, TrackingResult};
pub use state::TrackingState;
pub use visual::VisualPlaneTracker;

/// Input for one tick. Which variant a backend consumes depends on its kind;
/// the geodetic backend reads everything from the sensor hub.
#[derive(Clone, Copy)]
pub enum FrameInput<'a> {
    Image(&'a Mat),
    HitTest(&'a HitTestFrame),
    Sensors,
}

impl FrameInput<'_> {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::HitTest(_) => "hit-test frame",
            Self::Sensors => "sensors",
        }
    }
}

/// Contract shared by all backends.
///
/// `process_frame` never fails: unusable input yields a not-tracking result
/// and per-tick errors are folded into confidence decay.
pub trait TrackingBackend {
    fn kind(&self) -> BackendKind;

    /// Acquire detectors, sessions or sensor subscriptions.
    fn init(&mut self) -> Result<(), InitError>;

    fn process_frame(&mut self, input: FrameInput<'_>) -> TrackingResult;

    /// Drop history and confidence. Idempotent.
    fn reset(&mut self);

    /// Release every owned resource. Only the first call has an effect.
    fn dispose(&mut self);

    /// Whether poses should go through the smoothing bank.
    fn wants_smoothing(&self) -> bool {
        true
    }

    fn stats(&self) -> TrackerStats;
}
