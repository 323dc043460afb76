//! Hit-test tracker: surface hits from the host AR session.
//!
//! The host owns the session and reference spaces; this backend only asks it
//! for a hit-test source and ramps confidence on whether hits keep coming.

use std::sync::Arc;

use nalgebra::{Isometry3, Vector3};
use tracing::{debug, info, warn};

use crate::error::InitError;
use crate::geometry::{level_heading, Pose};
use crate::system::shared_state::SensorHub;
use crate::tracking::backend::BackendKind;
use crate::tracking::confidence::ConfidenceRamp;
use crate::tracking::result::{TrackerStats, TrackingPayload, TrackingResult};
use crate::tracking::{FrameInput, TrackingBackend, TrackingState};

/// Host session offering surface hit-testing.
pub trait HitTestPlatform: Send {
    fn supports_hit_test(&self) -> bool;

    /// Create the hit-test source. Called once from `init`.
    fn request_hit_test_source(&mut self) -> Result<(), InitError>;

    fn cancel_hit_test_source(&mut self);
}

/// One surface hit, in the session's reference space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTestHit {
    pub transform: Isometry3<f64>,
}

/// What the host session reports for one frame. Hits are ranked, best first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HitTestFrame {
    pub viewer_transform: Option<Isometry3<f64>>,
    pub hits: Vec<HitTestHit>,
}

pub struct HitTestTracker {
    platform: Box<dyn HitTestPlatform>,
    sensors: Arc<SensorHub>,
    confidence: ConfidenceRamp,
    stats: TrackerStats,
    source_active: bool,
    disposed: bool,
}

impl HitTestTracker {
    pub fn new(platform: Box<dyn HitTestPlatform>, sensors: Arc<SensorHub>) -> Self {
        Self {
            platform,
            sensors,
            confidence: ConfidenceRamp::new(),
            stats: TrackerStats::default(),
            source_active: false,
            disposed: false,
        }
    }

    pub fn confidence(&self) -> f64 {
        self.confidence.value()
    }

    fn process_hits(&mut self, frame: &HitTestFrame) -> TrackingResult {
        let orientation = self.sensors.latest_orientation();
        if !self.source_active {
            self.stats.record_idle();
            let mut result =
                TrackingResult::not_tracking(TrackingState::NoPriorFrame, self.confidence.value());
            result.orientation = orientation;
            return result;
        }

        // Hits cannot be related to the device without a viewer pose.
        let Some(viewer) = frame.viewer_transform else {
            self.stats.record_idle();
            debug!("hit-test frame without a viewer pose");
            let mut result =
                TrackingResult::not_tracking(TrackingState::NoPriorFrame, self.confidence.value());
            result.orientation = orientation;
            return result;
        };

        let top = frame.hits.first();
        match top {
            Some(_) => {
                self.confidence.boost();
                self.stats.record_success(frame.hits.len());
            }
            None => {
                self.confidence.decay();
                self.stats.record_failure();
            }
        }

        let confidence = self.confidence.value();
        let is_tracking = self.confidence.is_tracking();
        debug!(hits = frame.hits.len(), confidence, "hit-test tick");

        TrackingResult {
            state: TrackingState::from_tick(top.is_some(), is_tracking),
            is_tracking,
            has_features: top.is_some(),
            feature_count: frame.hits.len(),
            plane_count: frame.hits.len(),
            confidence,
            pose: top.map(|hit| hit_pose(&viewer, hit, confidence)),
            screen_anchor: None,
            orientation,
            payload: TrackingPayload::HitTest {
                viewer_transform: frame.viewer_transform,
            },
        }
    }
}

/// Hit relative to the viewer, in the viewer's level frame.
fn hit_pose(viewer: &Isometry3<f64>, hit: &HitTestHit, confidence: f64) -> Pose {
    let to_level = level_heading(&viewer.rotation).inverse();
    let offset = to_level * (hit.transform.translation.vector - viewer.translation.vector);
    let (roll, pitch, yaw) = (to_level * hit.transform.rotation).euler_angles();
    Pose::new(offset, Vector3::new(roll, pitch, yaw), confidence)
}

impl TrackingBackend for HitTestTracker {
    fn kind(&self) -> BackendKind {
        BackendKind::HitTest
    }

    fn init(&mut self) -> Result<(), InitError> {
        if self.disposed {
            return Err(InitError::Disposed);
        }
        if !self.platform.supports_hit_test() {
            return Err(InitError::Unsupported("hit-test".into()));
        }
        if !self.source_active {
            self.platform.request_hit_test_source()?;
            self.source_active = true;
        }
        info!("hit-test tracker initialised");
        Ok(())
    }

    fn process_frame(&mut self, input: FrameInput<'_>) -> TrackingResult {
        match input {
            FrameInput::HitTest(frame) => self.process_hits(frame),
            other => {
                warn!(input = other.describe(), "hit-test tracker expects a hit-test frame");
                self.stats.record_idle();
                TrackingResult::not_tracking(TrackingState::NoPriorFrame, self.confidence.value())
            }
        }
    }

    fn reset(&mut self) {
        self.confidence.reset();
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if self.source_active {
            self.platform.cancel_hit_test_source();
            self.source_active = false;
        }
        self.confidence.reset();
        self.disposed = true;
        info!(ticks = self.stats.ticks, "hit-test tracker disposed");
    }

    /// Host sessions already smooth their hit poses.
    fn wants_smoothing(&self) -> bool {
        false
    }

    fn stats(&self) -> TrackerStats {
        self.stats
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted host session counting source requests and cancellations.
    #[derive(Default)]
    pub(crate) struct FakePlatform {
        pub supported: bool,
        pub deny: bool,
        pub requests: Arc<AtomicUsize>,
        pub cancels: Arc<AtomicUsize>,
    }

    impl FakePlatform {
        pub(crate) fn supported() -> Self {
            Self {
                supported: true,
                ..Self::default()
            }
        }
    }

    impl HitTestPlatform for FakePlatform {
        fn supports_hit_test(&self) -> bool {
            self.supported
        }

        fn request_hit_test_source(&mut self) -> Result<(), InitError> {
            if self.deny {
                return Err(InitError::PermissionDenied("hit-test source".into()));
            }
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn cancel_hit_test_source(&mut self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub(crate) fn frame_with_hit(x: f64, z: f64) -> HitTestFrame {
        HitTestFrame {
            viewer_transform: Some(Isometry3::identity()),
            hits: vec![HitTestHit {
                transform: Isometry3::from_parts(
                    Translation3::new(x, 0.0, z),
                    UnitQuaternion::from_euler_angles(0.0, 0.3, 0.0),
                ),
            }],
        }
    }

    fn empty_frame() -> HitTestFrame {
        HitTestFrame {
            viewer_transform: Some(Isometry3::identity()),
            hits: Vec::new(),
        }
    }

    fn tracker() -> HitTestTracker {
        let mut t = HitTestTracker::new(Box::new(FakePlatform::supported()), SensorHub::new());
        t.init().unwrap();
        t
    }

    #[test]
    fn test_unsupported_platform() {
        let mut t = HitTestTracker::new(Box::new(FakePlatform::default()), SensorHub::new());
        assert!(matches!(t.init(), Err(InitError::Unsupported(_))));
    }

    #[test]
    fn test_permission_denied() {
        let platform = FakePlatform {
            supported: true,
            deny: true,
            ..FakePlatform::default()
        };
        let mut t = HitTestTracker::new(Box::new(platform), SensorHub::new());
        assert!(matches!(t.init(), Err(InitError::PermissionDenied(_))));
    }

    #[test]
    fn test_hits_ramp_confidence() {
        let mut t = tracker();
        let frame = frame_with_hit(0.5, -2.0);
        for _ in 0..3 {
            assert!(!t.process_frame(FrameInput::HitTest(&frame)).is_tracking);
        }
        let result = t.process_frame(FrameInput::HitTest(&frame));
        assert!(result.is_tracking);
        assert_eq!(result.state, TrackingState::Tracked);
        assert_eq!(result.plane_count, 1);

        let pose = result.pose.unwrap();
        assert_eq!(pose.position, Vector3::new(0.5, 0.0, -2.0));
        assert_relative_eq!(pose.rotation.y, 0.3, epsilon = 1e-12);
        assert!(!t.wants_smoothing());
    }

    #[test]
    fn test_missing_hits_decay() {
        let mut t = tracker();
        let hit = frame_with_hit(0.0, -1.0);
        for _ in 0..10 {
            t.process_frame(FrameInput::HitTest(&hit));
        }
        assert_eq!(t.confidence(), 1.0);

        let empty = empty_frame();
        let result = t.process_frame(FrameInput::HitTest(&empty));
        assert!(result.pose.is_none());
        assert!(result.is_tracking);
        assert_relative_eq!(result.confidence, 0.9, epsilon = 1e-12);

        for _ in 0..20 {
            t.process_frame(FrameInput::HitTest(&empty));
        }
        let result = t.process_frame(FrameInput::HitTest(&empty));
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.state, TrackingState::LostTrack);
    }

    #[test]
    fn test_missing_viewer_is_idle() {
        let mut t = tracker();
        let hit = frame_with_hit(0.0, -1.0);
        for _ in 0..5 {
            t.process_frame(FrameInput::HitTest(&hit));
        }
        let before = t.confidence();
        let stats = t.stats();

        let mut blind = hit.clone();
        blind.viewer_transform = None;
        let result = t.process_frame(FrameInput::HitTest(&blind));
        assert_eq!(result.state, TrackingState::NoPriorFrame);
        assert!(result.pose.is_none());
        assert_eq!(result.confidence, before);
        assert_eq!(t.confidence(), before);
        assert_eq!(t.stats().ticks, stats.ticks + 1);
        assert_eq!(t.stats().successful_ticks, stats.successful_ticks);
        assert_eq!(t.stats().failed_ticks, stats.failed_ticks);
    }

    #[test]
    fn test_pose_is_relative_to_viewer() {
        let mut t = tracker();
        let viewer = Isometry3::from_parts(
            Translation3::new(1.0, 1.5, 0.0),
            // Turned left 90° and pitched down: only the turn counts.
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2)
                * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -0.4),
        );
        let frame = HitTestFrame {
            viewer_transform: Some(viewer),
            hits: vec![HitTestHit {
                transform: Isometry3::from_parts(
                    Translation3::new(-1.0, 0.0, 0.0),
                    UnitQuaternion::from_axis_angle(
                        &Vector3::y_axis(),
                        std::f64::consts::FRAC_PI_2 + 0.3,
                    ),
                ),
            }],
        };
        let pose = t.process_frame(FrameInput::HitTest(&frame)).pose.unwrap();
        // Two metres ahead of the viewer and 1.5 m below it.
        assert_relative_eq!(pose.position, Vector3::new(0.0, -1.5, -2.0), epsilon = 1e-12);
        assert_relative_eq!(pose.rotation.y, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_dispose_cancels_source_once() {
        let platform = FakePlatform::supported();
        let requests = platform.requests.clone();
        let cancels = platform.cancels.clone();
        let mut t = HitTestTracker::new(Box::new(platform), SensorHub::new());
        t.init().unwrap();
        t.init().unwrap();
        assert_eq!(requests.load(Ordering::SeqCst), 1);
        t.dispose();
        t.dispose();
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(matches!(t.init(), Err(InitError::Disposed)));
    }

    #[test]
    fn test_reset_twice_equals_once() {
        let mut t = tracker();
        let hit = frame_with_hit(0.0, -1.0);
        t.process_frame(FrameInput::HitTest(&hit));
        t.reset();
        let once = t.confidence();
        t.reset();
        assert_eq!(t.confidence(), once);
        assert_eq!(once, 0.0);
    }
}
