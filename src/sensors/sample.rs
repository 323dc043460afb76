use nalgebra::Vector3;

use crate::geometry::normalize_degrees;

/// Device-orientation reading, angles in degrees.
///
/// `alpha` rotates about the vertical axis (counter-clockwise, 0 when the
/// device top points north on absolute sources), `beta` is front-back tilt,
/// `gamma` is left-right tilt.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationSample {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl OrientationSample {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self { alpha, beta, gamma }
    }

    /// Euler rotation in radians, laid out as `(beta, alpha, gamma)`.
    pub fn to_euler_radians(&self) -> Vector3<f64> {
        Vector3::new(
            self.beta.to_radians(),
            self.alpha.to_radians(),
            self.gamma.to_radians(),
        )
    }

    /// Clockwise compass heading in `[0, 360)`.
    pub fn compass_heading_deg(&self) -> f64 {
        normalize_degrees(360.0 - self.alpha)
    }
}

/// One geolocation fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub accuracy_m: f64,
    pub timestamp_ms: u64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f64, timestamp_ms: u64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy_m,
            timestamp_ms,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }
}
