//! Confidence-scored pose snapshot shared by every tracking backend.

use nalgebra::{UnitQuaternion, Vector3};

/// Tracked reference relative to the device.
///
/// `position` is expressed in the device's level frame: `-z` along the
/// device heading, `+x` to the right, `+y` up. `rotation` holds Euler angles
/// in radians (x = pitch, y = yaw, z = roll, matching the device-orientation
/// beta/alpha/gamma axes). A new `Pose` is
/// produced on every tick; values are never edited in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub rotation: Vector3<f64>,
    pub confidence: f64,
}

impl Pose {
    pub fn new(position: Vector3<f64>, rotation: Vector3<f64>, confidence: f64) -> Self {
        Self {
            position,
            rotation,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            confidence: 0.0,
        }
    }

    /// Same pose with a different position/rotation, confidence carried over.
    pub fn with_components(&self, position: Vector3<f64>, rotation: Vector3<f64>) -> Self {
        Self::new(position, rotation, self.confidence)
    }

    /// Orientation as a quaternion (intrinsic pitch/yaw/roll).
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.rotation.x, self.rotation.y, self.rotation.z)
    }
}

/// Rotation about world `+y` that carries `-z` onto the horizontal part of
/// `rotation`'s view direction. Identity when looking straight up or down.
pub fn level_heading(rotation: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    let forward = rotation * -Vector3::z();
    if forward.x.hypot(forward.z) < 1e-9 {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), (-forward.x).atan2(-forward.z))
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_confidence_is_clamped() {
        let p = Pose::new(Vector3::zeros(), Vector3::zeros(), 1.7);
        assert_eq!(p.confidence, 1.0);
        let p = Pose::new(Vector3::zeros(), Vector3::zeros(), -0.2);
        assert_eq!(p.confidence, 0.0);
    }

    #[test]
    fn test_with_components_keeps_confidence() {
        let p = Pose::new(Vector3::new(1.0, 2.0, 3.0), Vector3::zeros(), 0.8);
        let q = p.with_components(Vector3::zeros(), Vector3::new(0.1, 0.2, 0.3));
        assert_eq!(q.confidence, 0.8);
        assert_eq!(q.position, Vector3::zeros());
        assert_eq!(p.position, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_level_heading_drops_pitch() {
        let pitched = UnitQuaternion::from_euler_angles(-0.4, 0.0, 0.0);
        assert_relative_eq!(level_heading(&pitched).angle(), 0.0, epsilon = 1e-12);

        let yawed = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7)
            * UnitQuaternion::from_euler_angles(-0.4, 0.0, 0.0);
        let heading = level_heading(&yawed);
        assert_relative_eq!(heading.scaled_axis().y, 0.7, epsilon = 1e-12);

        let down = UnitQuaternion::from_euler_angles(-std::f64::consts::FRAC_PI_2, 0.0, 0.0);
        assert_eq!(level_heading(&down), UnitQuaternion::identity());
    }
}
