//! Commands sent from the UI collaborator to a running session.
//!
//! They travel over a bounded channel and are drained at the start of the
//! next tick, so they never interleave with frame processing.

use crate::config::PipelineConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Pin the model under the screen centre.
    Place,
    /// Unplace, drop tracking history and smoothing state.
    Reset,
    SetYawDegrees(f64),
    /// The renderer finished (or dropped) loading the model.
    ModelLoaded(bool),
    /// Re-apply runtime knobs without reinitialising.
    UpdateConfig(Box<PipelineConfig>),
}
