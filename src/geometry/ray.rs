//! Rays and planes in world space.

use nalgebra::{Point3, Unit, Vector3};

/// Below this |n·d| a ray counts as parallel to a plane.
const PARALLEL_EPSILON: f64 = 1e-9;

/// Half-line starting at `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Unit<Vector3<f64>>,
}

impl Ray {
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            origin,
            direction: Unit::new_normalize(direction),
        }
    }

    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction.into_inner() * t
    }
}

/// Plane `n·p + offset = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Unit<Vector3<f64>>,
    pub offset: f64,
}

impl Plane {
    /// Horizontal ground plane `y = 0`.
    pub fn ground() -> Self {
        Self {
            normal: Vector3::y_axis(),
            offset: 0.0,
        }
    }

    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) + self.offset
    }

    /// Orthogonal projection of `p` onto the plane.
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        p - self.normal.into_inner() * self.signed_distance(p)
    }

    /// Intersection of `ray` with the plane.
    ///
    /// `None` when the ray is parallel or the plane lies behind the origin.
    /// The returned point is snapped onto the plane so it satisfies the plane
    /// equation exactly.
    pub fn intersect(&self, ray: &Ray) -> Option<Point3<f64>> {
        let denom = self.normal.dot(ray.direction.as_ref());
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = -self.signed_distance(&ray.origin) / denom;
        if t < 0.0 {
            return None;
        }
        Some(self.project(&ray.at(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_hits_ground_exactly() {
        let ray = Ray::new(Point3::new(0.0, 1.5, 0.0), Vector3::new(0.0, -1.5, -3.0));
        let hit = Plane::ground().intersect(&ray).unwrap();
        assert_eq!(hit.y, 0.0);
        assert_relative_eq!(hit.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(hit.z, -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_parallel_ray_misses() {
        let ray = Ray::new(Point3::new(0.0, 1.5, 0.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(Plane::ground().intersect(&ray).is_none());
    }

    #[test]
    fn test_plane_behind_ray_misses() {
        let ray = Ray::new(Point3::new(0.0, 1.5, 0.0), Vector3::new(0.0, 1.0, -1.0));
        assert!(Plane::ground().intersect(&ray).is_none());
    }

    #[test]
    fn test_offset_plane() {
        // y = 2  ->  n = +y, offset = -2
        let plane = Plane {
            normal: Vector3::y_axis(),
            offset: -2.0,
        };
        let ray = Ray::new(Point3::new(1.0, 5.0, 1.0), Vector3::new(0.0, -1.0, 0.0));
        let hit = plane.intersect(&ray).unwrap();
        assert_eq!(hit.y, 2.0);
        assert_relative_eq!(hit.x, 1.0, epsilon = 1e-12);
    }
}
