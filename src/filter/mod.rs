//! Temporal smoothing: scalar Kalman filters and the six-axis pose bank.

pub mod kalman;
pub mod pose_filter;

pub use kalman::{ScalarKalman, DEFAULT_DT};
pub use pose_filter::PoseSmoother;
