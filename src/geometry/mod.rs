//! Geometry utilities: geodesic math, poses, rays and planes.

pub mod geodesic;
pub mod pose;
pub mod ray;

pub use geodesic::{bearing_deg, distance_m, normalize_degrees, relative_heading_deg};
pub use pose::{level_heading, Pose};
pub use ray::{Plane, Ray};
