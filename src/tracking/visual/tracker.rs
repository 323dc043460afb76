//! Visual plane tracker: ORB features matched frame to frame, a RANSAC
//! homography per tick and a confidence ramp deciding when the plane counts
//! as tracked.

use std::sync::Arc;

use nalgebra::{Point2, Vector3};
use opencv::core::{Mat, Point2f, Ptr, CV_8U};
use opencv::features2d::{ORB_ScoreType, ORB};
use opencv::imgproc;
use opencv::prelude::*;
use tracing::{debug, info, warn};

use crate::config::VisualConfig;
use crate::error::{InitError, TrackingError};
use crate::geometry::Pose;
use crate::sensors::OrientationSample;
use crate::system::shared_state::SensorHub;
use crate::tracking::backend::BackendKind;
use crate::tracking::confidence::ConfidenceRamp;
use crate::tracking::result::{
    GroundPlaneEstimate, TrackedPointPair, TrackerStats, TrackingPayload, TrackingResult,
};
use crate::tracking::visual::camera::CameraModel;
use crate::tracking::visual::features::{FeatureSet, FrameSlots};
use crate::tracking::visual::homography::{fit_homography, plane_offset, HomographyFit};
use crate::tracking::visual::matching::TemporalMatcher;
use crate::tracking::{FrameInput, TrackingBackend, TrackingState};

/// ORB detector and matcher, owned together and released together.
struct Detector {
    orb: Ptr<ORB>,
    matcher: TemporalMatcher,
    max_features: i32,
}

impl Detector {
    fn new(max_features: i32) -> opencv::Result<Self> {
        let orb = ORB::create(
            max_features,
            1.2,
            8,
            31,
            0,
            2,
            ORB_ScoreType::HARRIS_SCORE,
            31,
            20,
        )?;
        Ok(Self {
            orb,
            matcher: TemporalMatcher::new()?,
            max_features,
        })
    }

    fn detect(&mut self, gray: &Mat, features: &mut FeatureSet) -> opencv::Result<()> {
        features.keypoints.clear();
        self.orb.detect_and_compute(
            gray,
            &Mat::default(),
            &mut features.keypoints,
            &mut features.descriptors,
            false,
        )
    }
}

/// What the matching stage produced this tick.
enum Step {
    /// No previous frame to compare against.
    FirstFrame,
    Fitted {
        fit: HomographyFit,
        pairs: Vec<TrackedPointPair>,
    },
    Failed(TrackingError),
}

pub struct VisualPlaneTracker {
    config: VisualConfig,
    sensors: Arc<SensorHub>,
    detector: Option<Detector>,
    slots: FrameSlots,
    camera: Option<CameraModel>,
    confidence: ConfidenceRamp,
    plane: Option<GroundPlaneEstimate>,
    stats: TrackerStats,
    disposed: bool,
}

impl VisualPlaneTracker {
    pub fn new(config: VisualConfig, sensors: Arc<SensorHub>) -> Self {
        Self {
            config,
            sensors,
            detector: None,
            slots: FrameSlots::new(),
            camera: None,
            confidence: ConfidenceRamp::new(),
            plane: None,
            stats: TrackerStats::default(),
            disposed: false,
        }
    }

    pub fn config(&self) -> &VisualConfig {
        &self.config
    }

    pub fn confidence(&self) -> f64 {
        self.confidence.value()
    }

    pub fn plane(&self) -> Option<&GroundPlaneEstimate> {
        self.plane.as_ref()
    }

    pub fn camera(&self) -> Option<&CameraModel> {
        self.camera.as_ref()
    }

    /// Apply new knobs without reinitialising. A changed `max_features`
    /// recreates the detector; everything else takes effect next tick.
    pub fn set_config(&mut self, config: VisualConfig) -> Result<(), InitError> {
        validate(&config)?;
        if let Some(detector) = &self.detector {
            if detector.max_features != config.max_features {
                debug!(
                    from = detector.max_features,
                    to = config.max_features,
                    "recreating ORB detector"
                );
                self.detector = Some(Detector::new(config.max_features)?);
            }
        }
        self.config = config;
        Ok(())
    }

    fn process_image(&mut self, frame: &Mat) -> TrackingResult {
        let orientation = self.sensors.latest_orientation();

        let camera = match self.prepare(frame) {
            Ok(camera) => camera,
            Err(TrackingError::InputUnavailable(reason)) => {
                debug!(reason, "skipping frame");
                self.stats.record_idle();
                let mut result =
                    TrackingResult::not_tracking(TrackingState::NoPriorFrame, self.confidence.value());
                result.orientation = orientation;
                return result;
            }
            Err(err) => {
                warn!(%err, "failed to prepare frame");
                self.register_failure();
                let state = TrackingState::from_tick(false, self.confidence.is_tracking());
                return self.build_result(state, 0, Vec::new(), orientation);
            }
        };

        let (feature_count, step) = {
            let Some(detector) = self.detector.as_mut() else {
                return TrackingResult::not_tracking(TrackingState::NoPriorFrame, 0.0);
            };
            let (current, previous) = self.slots.split();
            match detector.detect(&current.gray, &mut current.features) {
                Err(err) => (0, Step::Failed(err.into())),
                Ok(()) => {
                    let count = current.features.len();
                    let step = match previous {
                        None => Step::FirstFrame,
                        Some(prev) => match match_and_fit(
                            &detector.matcher,
                            &prev.features,
                            &current.features,
                            &self.config,
                        ) {
                            Ok((fit, pairs)) => Step::Fitted { fit, pairs },
                            Err(err) => Step::Failed(err),
                        },
                    };
                    (count, step)
                }
            }
        };
        self.slots.advance();

        match step {
            Step::FirstFrame => {
                self.stats.record_idle();
                let state = if self.confidence.is_tracking() {
                    TrackingState::Tracked
                } else {
                    TrackingState::NoPriorFrame
                };
                self.build_result(state, feature_count, Vec::new(), orientation)
            }
            Step::Fitted { fit, pairs } => {
                let confidence = self.confidence.boost();
                let center = mean_point(pairs.iter().map(|p| p.curr));
                self.plane = Some(GroundPlaneEstimate {
                    homography: fit.homography,
                    inlier_count: fit.inlier_count,
                    center,
                    confidence,
                });
                self.stats.record_success(fit.inlier_count);
                debug!(
                    features = feature_count,
                    inliers = fit.inlier_count,
                    confidence,
                    width = camera.width,
                    "plane fit"
                );
                let state = TrackingState::from_tick(true, self.confidence.is_tracking());
                self.build_result(state, feature_count, pairs, orientation)
            }
            Step::Failed(err) => {
                match &err {
                    TrackingError::OpenCv(inner) => warn!(%inner, "opencv error during tracking"),
                    other => debug!(reason = %other, "tick failed"),
                }
                self.register_failure();
                let state = TrackingState::from_tick(false, self.confidence.is_tracking());
                self.build_result(state, feature_count, Vec::new(), orientation)
            }
        }
    }

    /// Validate the frame, (re)allocate buffers on a size change and write
    /// the grayscale image into the current slot.
    fn prepare(&mut self, frame: &Mat) -> Result<CameraModel, TrackingError> {
        if self.disposed || self.detector.is_none() {
            return Err(TrackingError::InputUnavailable("tracker not initialised"));
        }
        let (cols, rows) = (frame.cols(), frame.rows());
        if cols <= 0 || rows <= 0 {
            return Err(TrackingError::InputUnavailable("zero-sized frame"));
        }
        if frame.depth() != CV_8U {
            return Err(TrackingError::InputUnavailable("unsupported pixel depth"));
        }

        let (width, height) = (cols as u32, rows as u32);
        let camera = match self.camera {
            Some(camera) if camera.same_size(width, height) && self.slots.is_allocated() => camera,
            _ => {
                info!(width, height, "allocating frame buffers");
                self.slots.reallocate(rows, cols)?;
                // The homography is in the old frame's pixel coordinates.
                self.plane = None;
                let camera = CameraModel::approximate(width, height);
                self.camera = Some(camera);
                camera
            }
        };

        let (current, _) = self.slots.split();
        match frame.channels() {
            1 => frame.copy_to(&mut current.gray)?,
            3 => imgproc::cvt_color_def(frame, &mut current.gray, imgproc::COLOR_BGR2GRAY)?,
            4 => imgproc::cvt_color_def(frame, &mut current.gray, imgproc::COLOR_RGBA2GRAY)?,
            _ => return Err(TrackingError::InputUnavailable("unsupported channel count")),
        }
        Ok(camera)
    }

    fn register_failure(&mut self) {
        let confidence = self.confidence.decay();
        if let Some(plane) = &mut self.plane {
            plane.confidence = confidence;
        }
        self.stats.record_failure();
    }

    fn build_result(
        &self,
        state: TrackingState,
        feature_count: usize,
        matches: Vec<TrackedPointPair>,
        orientation: Option<OrientationSample>,
    ) -> TrackingResult {
        let confidence = self.confidence.value();
        let is_tracking = self.confidence.is_tracking();
        let tracked_plane = self.plane.filter(|_| is_tracking);

        let (pose, screen_anchor) = match (tracked_plane, self.camera) {
            (Some(plane), Some(camera)) => {
                let position =
                    plane_offset(&plane.homography, &camera, self.config.assumed_depth_m);
                let rotation = orientation
                    .map(|o| o.to_euler_radians())
                    .unwrap_or_else(Vector3::zeros);
                (
                    Some(Pose::new(position, rotation, confidence)),
                    Some(camera.normalize(&plane.center)),
                )
            }
            _ => (None, None),
        };

        TrackingResult {
            state,
            is_tracking,
            has_features: feature_count > 0,
            feature_count,
            plane_count: usize::from(tracked_plane.is_some()),
            confidence,
            pose,
            screen_anchor,
            orientation,
            payload: TrackingPayload::Visual {
                matches,
                plane: self.plane,
            },
        }
    }
}

impl TrackingBackend for VisualPlaneTracker {
    fn kind(&self) -> BackendKind {
        BackendKind::Visual
    }

    fn init(&mut self) -> Result<(), InitError> {
        if self.disposed {
            return Err(InitError::Disposed);
        }
        validate(&self.config)?;
        if self.detector.is_none() {
            self.detector = Some(Detector::new(self.config.max_features)?);
        }
        info!(
            max_features = self.config.max_features,
            min_inliers = self.config.min_inliers,
            "visual plane tracker initialised"
        );
        Ok(())
    }

    fn process_frame(&mut self, input: FrameInput<'_>) -> TrackingResult {
        match input {
            FrameInput::Image(frame) => self.process_image(frame),
            other => {
                warn!(input = other.describe(), "visual tracker expects an image");
                self.stats.record_idle();
                TrackingResult::not_tracking(TrackingState::NoPriorFrame, self.confidence.value())
            }
        }
    }

    fn reset(&mut self) {
        self.slots.invalidate();
        self.confidence.reset();
        self.plane = None;
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.detector = None;
        self.slots.release();
        self.camera = None;
        self.plane = None;
        self.confidence.reset();
        self.disposed = true;
        info!(ticks = self.stats.ticks, "visual plane tracker disposed");
    }

    fn stats(&self) -> TrackerStats {
        self.stats
    }
}

fn validate(config: &VisualConfig) -> Result<(), InitError> {
    if config.max_features <= 0 {
        return Err(InitError::InvalidConfig(format!(
            "max_features must be positive, got {}",
            config.max_features
        )));
    }
    if !(config.ransac_threshold > 0.0) {
        return Err(InitError::InvalidConfig(format!(
            "ransac_threshold must be positive, got {}",
            config.ransac_threshold
        )));
    }
    if !(config.assumed_depth_m > 0.0) {
        return Err(InitError::InvalidConfig(format!(
            "assumed_depth_m must be positive, got {}",
            config.assumed_depth_m
        )));
    }
    Ok(())
}

/// Match `prev → curr`, fit a homography and return it with the inlier pairs.
fn match_and_fit(
    matcher: &TemporalMatcher,
    prev: &FeatureSet,
    curr: &FeatureSet,
    config: &VisualConfig,
) -> Result<(HomographyFit, Vec<TrackedPointPair>), TrackingError> {
    let required = config.min_inliers;
    let matches = matcher.match_features(prev, curr)?;
    if matches.len() < required || matches.len() < 4 {
        return Err(TrackingError::MatchingFailure {
            found: matches.len(),
            required,
        });
    }

    let mut src = Vec::with_capacity(matches.len());
    let mut dst = Vec::with_capacity(matches.len());
    for m in &matches {
        src.push(prev.keypoints.get(m.query_idx as usize)?.pt());
        dst.push(curr.keypoints.get(m.train_idx as usize)?.pt());
    }

    let fit = fit_homography(&src, &dst, config.ransac_threshold)?
        .ok_or(TrackingError::FitRejected { inliers: 0, required })?;
    if fit.inlier_count < required {
        return Err(TrackingError::FitRejected {
            inliers: fit.inlier_count,
            required,
        });
    }

    let pairs = src
        .iter()
        .zip(&dst)
        .zip(&fit.inlier_mask)
        .filter(|(_, &inlier)| inlier)
        .map(|((p, c), _)| TrackedPointPair {
            prev: to_point(p),
            curr: to_point(c),
        })
        .collect();
    Ok((fit, pairs))
}

fn to_point(p: &Point2f) -> Point2<f32> {
    Point2::new(p.x, p.y)
}

fn mean_point(points: impl Iterator<Item = Point2<f32>>) -> Point2<f64> {
    let (sum_x, sum_y, n) = points.fold((0.0, 0.0, 0usize), |(sx, sy, n), p| {
        (sx + p.x as f64, sy + p.y as f64, n + 1)
    });
    if n == 0 {
        return Point2::origin();
    }
    Point2::new(sum_x / n as f64, sum_y / n as f64)
}
