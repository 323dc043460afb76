//! Sensor sample types consumed by the trackers.

pub mod sample;

pub use sample::{LocationFix, OrientationSample};
