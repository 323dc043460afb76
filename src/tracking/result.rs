//! Tracking results and diagnostics structures.
//!
//! These types describe what happened during a single tick:
//! - high level tracking state and confidence
//! - the pose estimate, if any
//! - feature / plane counts and a backend-specific payload
//! - running statistics for status displays

use nalgebra::{Isometry3, Matrix3, Point2};

use crate::geometry::Pose;
use crate::sensors::{LocationFix, OrientationSample};
use crate::tracking::TrackingState;

/// Summary of one tracker tick. Produced once per tick, consumed immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingResult {
    pub state: TrackingState,
    pub is_tracking: bool,
    pub has_features: bool,
    pub feature_count: usize,
    pub plane_count: usize,
    /// Backend confidence after this tick.
    pub confidence: f64,
    pub pose: Option<Pose>,
    /// Where on screen the tracked surface sits, normalised to `[0, 1]`
    /// (origin top-left). `None` means "use the screen centre".
    pub screen_anchor: Option<Point2<f64>>,
    /// Orientation sample the tick used, if one was available.
    pub orientation: Option<OrientationSample>,
    pub payload: TrackingPayload,
}

impl TrackingResult {
    /// Result for a tick that produced nothing usable.
    pub fn not_tracking(state: TrackingState, confidence: f64) -> Self {
        Self {
            state,
            is_tracking: false,
            has_features: false,
            feature_count: 0,
            plane_count: 0,
            confidence,
            pose: None,
            screen_anchor: None,
            orientation: None,
            payload: TrackingPayload::None,
        }
    }
}

/// Modality-specific data riding along with a result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TrackingPayload {
    #[default]
    None,
    Visual {
        /// Inlier correspondences of this tick, for debug drawing.
        matches: Vec<TrackedPointPair>,
        plane: Option<GroundPlaneEstimate>,
    },
    HitTest {
        viewer_transform: Option<Isometry3<f64>>,
    },
    Geodetic {
        fix: LocationFix,
        distance_m: f64,
        bearing_deg: f64,
    },
}

/// Correspondence between two feature observations on consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPointPair {
    pub prev: Point2<f32>,
    pub curr: Point2<f32>,
}

/// The visual tracker's current belief about the ground plane.
///
/// Replaced wholesale on each successful fit; `confidence` keeps decaying on
/// failed ticks instead of resetting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPlaneEstimate {
    pub homography: Matrix3<f64>,
    pub inlier_count: usize,
    /// Mean inlier position in the current frame, pixels.
    pub center: Point2<f64>,
    pub confidence: f64,
}

/// Running counters for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerStats {
    pub ticks: u64,
    pub successful_ticks: u64,
    pub failed_ticks: u64,
    /// Inliers / hits / fixes behind the last successful tick.
    pub last_support: usize,
}

impl TrackerStats {
    pub fn record_success(&mut self, support: usize) {
        self.ticks += 1;
        self.successful_ticks += 1;
        self.last_support = support;
    }

    pub fn record_failure(&mut self) {
        self.ticks += 1;
        self.failed_ticks += 1;
    }

    pub fn record_idle(&mut self) {
        self.ticks += 1;
    }
}
