//! Scalar constant-velocity Kalman filter.
//!
//! State is `[value, velocity]` with a fixed step of [`DEFAULT_DT`] and a full
//! 2x2 covariance. Only the value is measured.

use nalgebra::{Matrix2, RowVector2, Vector2};

/// Fixed filter time step (one display refresh at 30 Hz).
pub const DEFAULT_DT: f64 = 1.0 / 30.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarKalman {
    /// `[value, velocity]`
    state: Vector2<f64>,
    covariance: Matrix2<f64>,
    process_noise: f64,
    measurement_noise: f64,
    dt: f64,
}

impl ScalarKalman {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            state: Vector2::zeros(),
            covariance: Matrix2::identity(),
            process_noise,
            measurement_noise,
            dt: DEFAULT_DT,
        }
    }

    fn transition(&self) -> Matrix2<f64> {
        Matrix2::new(1.0, self.dt, 0.0, 1.0)
    }

    /// Advance the state one step: `value += velocity * dt`, `P = F P Fᵀ + Q`.
    pub fn predict(&mut self) {
        let f = self.transition();
        self.state = f * self.state;
        self.covariance = f * self.covariance * f.transpose()
            + Matrix2::identity() * self.process_noise;
    }

    /// Correct value and velocity with a measurement of the value.
    pub fn update(&mut self, measurement: f64) {
        let h = RowVector2::new(1.0, 0.0);
        let innovation = measurement - self.state.x;
        // S = H P Hᵀ + R
        let s = self.covariance[(0, 0)] + self.measurement_noise;
        if s <= f64::EPSILON {
            return;
        }
        let gain: Vector2<f64> = self.covariance.column(0) / s;

        self.state += gain * innovation;
        self.covariance = (Matrix2::identity() - gain * h) * self.covariance;
    }

    /// `predict()` then `update(measurement)`, returning the new estimate.
    pub fn filter(&mut self, measurement: f64) -> f64 {
        self.predict();
        self.update(measurement);
        self.state.x
    }

    /// Back to zero state. Noise parameters are kept.
    pub fn reset(&mut self) {
        self.state = Vector2::zeros();
        self.covariance = Matrix2::identity();
    }

    /// Change noise parameters without touching the state.
    pub fn set_noise(&mut self, process_noise: f64, measurement_noise: f64) {
        self.process_noise = process_noise;
        self.measurement_noise = measurement_noise;
    }

    pub fn value(&self) -> f64 {
        self.state.x
    }

    pub fn velocity(&self) -> f64 {
        self.state.y
    }

    /// Variance of the value estimate.
    pub fn variance(&self) -> f64 {
        self.covariance[(0, 0)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn errors(q: f64, r: f64, target: f64, ticks: usize) -> Vec<f64> {
        let mut kf = ScalarKalman::new(q, r);
        (0..ticks).map(|_| (kf.filter(target) - target).abs()).collect()
    }

    #[test]
    fn test_constant_measurement_converges() {
        for (q, r) in [(0.01, 0.1), (0.005, 0.05), (0.1, 0.1), (1.0, 0.01), (10.0, 10.0)] {
            for target in [2.5, -1.0] {
                let errors = errors(q, r, target, 400);
                for i in 20..errors.len() {
                    assert!(
                        errors[i] <= errors[i - 1] + 1e-12,
                        "q={q} r={r}: error grew at tick {i}: {} -> {}",
                        errors[i - 1],
                        errors[i]
                    );
                }
                assert!(errors[errors.len() - 1] < 1e-6, "q={q} r={r}: did not converge");
            }
        }
    }

    #[test]
    fn test_heavy_smoothing_stays_bounded() {
        for q in [1e-6, 1e-4, 1e-3] {
            for r in [1.0, 10.0, 100.0] {
                for target in [2.5, -1.0] {
                    let errors = errors(q, r, target, 20_000);
                    let worst = errors.iter().cloned().fold(0.0, f64::max);
                    assert!(
                        worst <= target.abs(),
                        "q={q} r={r}: error {worst} exceeded the initial offset"
                    );
                    let last = errors[errors.len() - 1];
                    assert!(last < 1e-6, "q={q} r={r}: still {last} away after 20000 ticks");
                }
            }
        }
    }

    #[test]
    fn test_first_filter_moves_toward_measurement() {
        let mut kf = ScalarKalman::new(0.01, 0.1);
        let out = kf.filter(1.0);
        assert!(out > 0.0 && out < 1.0);
        assert!(kf.velocity() > 0.0);
    }

    #[test]
    fn test_variance_shrinks_after_update() {
        let mut kf = ScalarKalman::new(0.01, 0.1);
        kf.predict();
        let before = kf.variance();
        kf.update(0.0);
        assert!(kf.variance() < before);
    }

    #[test]
    fn test_reset_returns_to_zero_state() {
        let mut kf = ScalarKalman::new(0.01, 0.1);
        for _ in 0..20 {
            kf.filter(5.0);
        }
        kf.reset();
        assert_eq!(kf, ScalarKalman::new(0.01, 0.1));
        kf.reset();
        assert_eq!(kf, ScalarKalman::new(0.01, 0.1));
    }

    #[test]
    fn test_noisy_measurements_are_smoothed() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut kf = ScalarKalman::new(0.01, 0.1);
        // Settle on the true value first.
        for _ in 0..100 {
            kf.filter(1.0);
        }

        let mut raw_sq = 0.0;
        let mut filtered_sq = 0.0;
        for _ in 0..500 {
            let noisy = 1.0 + rng.gen_range(-0.2..0.2);
            let out = kf.filter(noisy);
            raw_sq += (noisy - 1.0f64).powi(2);
            filtered_sq += (out - 1.0f64).powi(2);
        }
        assert!(filtered_sq < raw_sq);
    }

    #[test]
    fn test_set_noise_keeps_state() {
        let mut kf = ScalarKalman::new(0.01, 0.1);
        kf.filter(3.0);
        let value = kf.value();
        kf.set_noise(0.5, 0.5);
        assert_relative_eq!(kf.value(), value);
    }
}
