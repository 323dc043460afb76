//! Geodetic tracker: latest GPS fix and compass heading against a fixed
//! target, expressed in a local tangent plane around the device.
//!
//! Axes follow the scene convention: `-z` is straight ahead along the
//! device heading, `+x` to the right, `+y` up.

use std::sync::Arc;

use nalgebra::Vector3;
use tracing::{debug, info, warn};

use crate::config::{GeoTarget, GeodeticConfig};
use crate::error::InitError;
use crate::geometry::{bearing_deg, distance_m, relative_heading_deg, Pose};
use crate::sensors::LocationFix;
use crate::system::shared_state::SensorHub;
use crate::tracking::backend::BackendKind;
use crate::tracking::result::{TrackerStats, TrackingPayload, TrackingResult};
use crate::tracking::{FrameInput, TrackingBackend, TrackingState};

/// Distance and bearing from one fix to the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticSolution {
    pub fix: LocationFix,
    pub distance_m: f64,
    pub bearing_deg: f64,
}

impl GeodeticSolution {
    pub fn solve(fix: LocationFix, target: &GeoTarget) -> Self {
        Self {
            fix,
            distance_m: distance_m(fix.latitude, fix.longitude, target.latitude, target.longitude),
            bearing_deg: bearing_deg(fix.latitude, fix.longitude, target.latitude, target.longitude),
        }
    }
}

pub struct GeodeticTracker {
    config: GeodeticConfig,
    sensors: Arc<SensorHub>,
    /// Location sequence number the cached solution was computed from.
    solved_seq: u64,
    solution: Option<GeodeticSolution>,
    stats: TrackerStats,
    disposed: bool,
}

impl GeodeticTracker {
    pub fn new(config: GeodeticConfig, sensors: Arc<SensorHub>) -> Self {
        Self {
            config,
            sensors,
            solved_seq: 0,
            solution: None,
            stats: TrackerStats::default(),
            disposed: false,
        }
    }

    pub fn solution(&self) -> Option<&GeodeticSolution> {
        self.solution.as_ref()
    }

    pub fn set_config(&mut self, config: GeodeticConfig) -> Result<(), InitError> {
        validate(&config)?;
        if config.target != self.config.target {
            // Force a recompute against the new target.
            self.solved_seq = 0;
            self.solution = None;
        }
        self.config = config;
        Ok(())
    }

    /// Fix accuracy and distance both inside the configured gates.
    pub fn within_gates(&self, solution: &GeodeticSolution) -> bool {
        solution.fix.accuracy_m <= self.config.accuracy_threshold_m
            && solution.distance_m >= self.config.min_distance_m
            && solution.distance_m <= self.config.max_distance_m
    }

    /// `min(1, threshold / accuracy)`.
    pub fn fix_confidence(&self, fix: &LocationFix) -> f64 {
        if fix.accuracy_m <= 0.0 {
            return 1.0;
        }
        (self.config.accuracy_threshold_m / fix.accuracy_m).min(1.0)
    }

    /// Pick up a new fix from the hub, if one arrived since the last tick.
    fn refresh(&mut self) {
        let seq = self.sensors.location_seq();
        if seq == self.solved_seq && self.solution.is_some() {
            return;
        }
        if let Some(fix) = self.sensors.latest_location() {
            let solution = GeodeticSolution::solve(fix, &self.config.target);
            debug!(
                distance_m = solution.distance_m,
                bearing_deg = solution.bearing_deg,
                accuracy_m = fix.accuracy_m,
                "new location fix"
            );
            self.solution = Some(solution);
            self.solved_seq = seq;
        }
    }

    fn process_sensors(&mut self) -> TrackingResult {
        if self.disposed {
            self.stats.record_idle();
            return TrackingResult::not_tracking(TrackingState::NoPriorFrame, 0.0);
        }
        self.refresh();
        let orientation = self.sensors.latest_orientation();

        let Some(solution) = self.solution else {
            self.stats.record_idle();
            let mut result = TrackingResult::not_tracking(TrackingState::NoPriorFrame, 0.0);
            result.orientation = orientation;
            return result;
        };

        let is_tracking = self.within_gates(&solution);
        let confidence = self.fix_confidence(&solution.fix);
        let pose = if is_tracking {
            self.stats.record_success(1);
            let heading = orientation.map(|o| o.compass_heading_deg()).unwrap_or(0.0);
            let theta = relative_heading_deg(heading, solution.bearing_deg).to_radians();
            let d = solution.distance_m;
            let dy = self.config.target.altitude - solution.fix.altitude.unwrap_or(0.0);
            let rotation = orientation
                .map(|o| o.to_euler_radians())
                .unwrap_or_else(Vector3::zeros);
            Some(Pose::new(
                Vector3::new(d * theta.sin(), dy, -d * theta.cos()),
                rotation,
                confidence,
            ))
        } else {
            self.stats.record_failure();
            None
        };

        TrackingResult {
            state: TrackingState::from_tick(is_tracking, is_tracking),
            is_tracking,
            has_features: true,
            feature_count: 1,
            plane_count: 0,
            confidence,
            pose,
            screen_anchor: None,
            orientation,
            payload: TrackingPayload::Geodetic {
                fix: solution.fix,
                distance_m: solution.distance_m,
                bearing_deg: solution.bearing_deg,
            },
        }
    }
}

impl TrackingBackend for GeodeticTracker {
    fn kind(&self) -> BackendKind {
        BackendKind::Geodetic
    }

    fn init(&mut self) -> Result<(), InitError> {
        if self.disposed {
            return Err(InitError::Disposed);
        }
        validate(&self.config)?;
        info!(
            target_lat = self.config.target.latitude,
            target_lon = self.config.target.longitude,
            "geodetic tracker initialised"
        );
        Ok(())
    }

    fn process_frame(&mut self, input: FrameInput<'_>) -> TrackingResult {
        if !matches!(input, FrameInput::Sensors) {
            warn!(input = input.describe(), "geodetic tracker ignores frame input");
        }
        self.process_sensors()
    }

    fn reset(&mut self) {
        self.solution = None;
        self.solved_seq = 0;
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.solution = None;
        self.disposed = true;
        info!(ticks = self.stats.ticks, "geodetic tracker disposed");
    }

    fn stats(&self) -> TrackerStats {
        self.stats
    }
}

fn validate(config: &GeodeticConfig) -> Result<(), InitError> {
    if !(config.accuracy_threshold_m > 0.0) {
        return Err(InitError::InvalidConfig(
            "accuracy_threshold_m must be positive".into(),
        ));
    }
    if !(config.min_distance_m >= 0.0 && config.min_distance_m <= config.max_distance_m) {
        return Err(InitError::InvalidConfig(format!(
            "distance gate [{}, {}] is empty",
            config.min_distance_m, config.max_distance_m
        )));
    }
    let target = &config.target;
    if !(-90.0..=90.0).contains(&target.latitude) || !(-180.0..=180.0).contains(&target.longitude) {
        return Err(InitError::InvalidConfig(format!(
            "target ({}, {}) is not a valid coordinate",
            target.latitude, target.longitude
        )));
    }
    Ok(())
}
