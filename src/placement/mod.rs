//! Placement: turns the tracker's screen anchor into a world position and
//! owns the anchor lifecycle (preview, place, reset).

pub mod anchor;
pub mod camera;
pub mod placer;

pub use anchor::{Anchor, Indicator};
pub use camera::VirtualCamera;
pub use placer::{Placement, SCREEN_CENTRE};
