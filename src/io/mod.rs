//! Recorded sessions for offline replay.

pub mod recording;

pub use recording::{FrameEntry, OrientationEntry, Recording};
