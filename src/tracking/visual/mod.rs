//! Lightweight single-plane visual tracker.

pub mod camera;
pub mod features;
pub mod homography;
pub mod matching;
pub mod tracker;

pub use camera::CameraModel;
pub use features::{FeatureSet, FrameSlot, FrameSlots};
pub use homography::{fit_homography, plane_offset, HomographyFit};
pub use matching::{filter_by_distance, TemporalMatcher};
pub use tracker::VisualPlaneTracker;
