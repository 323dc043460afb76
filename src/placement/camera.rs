use nalgebra::{Isometry3, Point2, Point3, UnitQuaternion, Vector3};

use crate::geometry::{level_heading, Ray};

/// Perspective camera of the rendering collaborator, looking down its local
/// `-z` axis with `+y` up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualCamera {
    pub position: Point3<f64>,
    /// Camera-to-world rotation.
    pub rotation: UnitQuaternion<f64>,
    /// Vertical field of view, degrees.
    pub fov_y_deg: f64,
    /// Width over height.
    pub aspect: f64,
}

impl VirtualCamera {
    pub fn look_at(eye: Point3<f64>, target: Point3<f64>, fov_y_deg: f64, aspect: f64) -> Self {
        let view = Isometry3::look_at_rh(&eye, &target, &Vector3::y());
        Self {
            position: eye,
            rotation: view.rotation.inverse(),
            fov_y_deg,
            aspect,
        }
    }

    /// Unit view direction in world space.
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * -Vector3::z()
    }

    /// Yaw-only part of the camera rotation: the frame tracked poses are
    /// expressed in.
    pub fn heading(&self) -> UnitQuaternion<f64> {
        level_heading(&self.rotation)
    }

    /// Screen coordinates in `[0, 1]` (origin top-left) to NDC in `[-1, 1]`
    /// (origin centre, `+y` up).
    pub fn to_ndc(screen: &Point2<f64>) -> Point2<f64> {
        Point2::new(2.0 * screen.x - 1.0, 1.0 - 2.0 * screen.y)
    }

    /// World-space ray through a screen point.
    pub fn screen_ray(&self, screen: &Point2<f64>) -> Ray {
        let ndc = Self::to_ndc(screen);
        let half_height = (self.fov_y_deg.to_radians() / 2.0).tan();
        let local = Vector3::new(ndc.x * half_height * self.aspect, ndc.y * half_height, -1.0);
        Ray::new(self.position, self.rotation * local)
    }
}

impl Default for VirtualCamera {
    /// Eye height of a handheld device, looking at the floor 3 m ahead.
    fn default() -> Self {
        Self::look_at(
            Point3::new(0.0, 1.5, 0.0),
            Point3::new(0.0, 0.0, -3.0),
            60.0,
            16.0 / 9.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forward_points_at_target() {
        let cam = VirtualCamera::default();
        let expected = Vector3::new(0.0, -1.5, -3.0).normalize();
        assert_relative_eq!(cam.forward(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_heading_ignores_pitch() {
        assert_relative_eq!(VirtualCamera::default().heading().angle(), 0.0, epsilon = 1e-12);

        // Looking down towards -x: heading turns +90° about +y.
        let cam = VirtualCamera::look_at(
            Point3::new(0.0, 1.5, 0.0),
            Point3::new(-3.0, 0.0, 0.0),
            60.0,
            1.0,
        );
        let ahead = cam.heading() * -Vector3::z();
        assert_relative_eq!(ahead, -Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_ndc_corners() {
        assert_eq!(VirtualCamera::to_ndc(&Point2::new(0.5, 0.5)), Point2::new(0.0, 0.0));
        assert_eq!(VirtualCamera::to_ndc(&Point2::new(0.0, 0.0)), Point2::new(-1.0, 1.0));
        assert_eq!(VirtualCamera::to_ndc(&Point2::new(1.0, 1.0)), Point2::new(1.0, -1.0));
    }

    #[test]
    fn test_centre_ray_is_forward() {
        let cam = VirtualCamera::default();
        let ray = cam.screen_ray(&Point2::new(0.5, 0.5));
        assert_eq!(ray.origin, cam.position);
        assert_relative_eq!(ray.direction.into_inner(), cam.forward(), epsilon = 1e-12);
    }

    #[test]
    fn test_right_edge_ray_spans_half_fov() {
        let cam = VirtualCamera::look_at(Point3::origin(), Point3::new(0.0, 0.0, -1.0), 90.0, 1.0);
        let ray = cam.screen_ray(&Point2::new(1.0, 0.5));
        // tan(45°) = 1, so the edge ray is at 45° to the right.
        let expected = Vector3::new(1.0, 0.0, -1.0).normalize();
        assert_relative_eq!(ray.direction.into_inner(), expected, epsilon = 1e-12);
    }
}
