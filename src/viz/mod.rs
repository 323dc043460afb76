//! Optional visualization, enabled with the `viz` feature.

pub mod rerun;

pub use self::rerun::RerunVisualizer;
