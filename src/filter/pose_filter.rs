//! Six-axis pose smoothing built from independent scalar filters.

use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;

use crate::config::SmoothingConfig;
use crate::filter::kalman::ScalarKalman;
use crate::geometry::Pose;

/// Bank of six uncoupled scalar Kalman filters.
///
/// Position axes run with `(Q, R)`, rotation axes with `(Q/2, R/2)`.
/// Cross-axis correlation is not modelled. Rotation measurements are
/// unwrapped against the previous one so a reading crossing `±π` does not
/// swing the estimate through a full turn.
#[derive(Debug, Clone)]
pub struct PoseSmoother {
    position: [ScalarKalman; 3],
    rotation: [ScalarKalman; 3],
    last_rotation: Option<Vector3<f64>>,
}

/// `angle` shifted by whole turns to lie within `π` of `reference`.
fn unwrap_angle(reference: f64, angle: f64) -> f64 {
    reference + (angle - reference + PI).rem_euclid(TAU) - PI
}

impl PoseSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        let q = config.process_noise;
        let r = config.measurement_noise;
        Self {
            position: std::array::from_fn(|_| ScalarKalman::new(q, r)),
            rotation: std::array::from_fn(|_| ScalarKalman::new(q / 2.0, r / 2.0)),
            last_rotation: None,
        }
    }

    /// Filter every axis of `pose`; confidence passes through untouched.
    pub fn filter(&mut self, pose: &Pose) -> Pose {
        let position = Vector3::new(
            self.position[0].filter(pose.position.x),
            self.position[1].filter(pose.position.y),
            self.position[2].filter(pose.position.z),
        );
        let measured = match self.last_rotation {
            Some(last) => pose.rotation.zip_map(&last, |angle, prev| unwrap_angle(prev, angle)),
            None => pose.rotation,
        };
        self.last_rotation = Some(measured);
        let rotation = Vector3::new(
            self.rotation[0].filter(measured.x),
            self.rotation[1].filter(measured.y),
            self.rotation[2].filter(measured.z),
        );
        pose.with_components(position, rotation)
    }

    /// Zero all six filters so stale velocity cannot leak into a new placement.
    pub fn reset(&mut self) {
        for kf in self.position.iter_mut().chain(self.rotation.iter_mut()) {
            kf.reset();
        }
        self.last_rotation = None;
    }

    /// Retune without resetting state.
    pub fn set_noise(&mut self, config: SmoothingConfig) {
        let q = config.process_noise;
        let r = config.measurement_noise;
        for kf in &mut self.position {
            kf.set_noise(q, r);
        }
        for kf in &mut self.rotation {
            kf.set_noise(q / 2.0, r / 2.0);
        }
    }

    /// Current smoothed estimate without feeding a new measurement.
    pub fn current(&self) -> (Vector3<f64>, Vector3<f64>) {
        (
            Vector3::new(
                self.position[0].value(),
                self.position[1].value(),
                self.position[2].value(),
            ),
            Vector3::new(
                self.rotation[0].value(),
                self.rotation[1].value(),
                self.rotation[2].value(),
            ),
        )
    }
}

impl Default for PoseSmoother {
    fn default() -> Self {
        Self::new(SmoothingConfig::default())
    }
}
