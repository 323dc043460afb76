use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

/// Where the virtual object is pinned in the world.
///
/// Once `placed`, `world_position` does not move until a reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub world_position: Point3<f64>,
    pub rotation_y_degrees: f64,
    pub placed: bool,
}

impl Anchor {
    pub fn placed_at(world_position: Point3<f64>, rotation_y_degrees: f64) -> Self {
        Self {
            world_position,
            rotation_y_degrees,
            placed: true,
        }
    }

    pub fn transform(&self) -> Isometry3<f64> {
        yaw_transform(&self.world_position, self.rotation_y_degrees)
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self {
            world_position: Point3::origin(),
            rotation_y_degrees: 0.0,
            placed: false,
        }
    }
}

/// Live placement preview, shown while nothing is placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicator {
    pub position: Point3<f64>,
    pub visible: bool,
}

impl Default for Indicator {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            visible: false,
        }
    }
}

/// Translation plus a rotation about world `+y`.
pub fn yaw_transform(position: &Point3<f64>, yaw_degrees: f64) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::from(position.coords),
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw_degrees.to_radians()),
    )
}
