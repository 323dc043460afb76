//! Session orchestration and shared state.
//!
//! This module contains the top-level `ArSession` that wires the active
//! tracker, the smoothing bank and placement together, along with the shared
//! sensor slots and the UI command type.

pub mod messages;
mod session;
pub mod shared_state;

pub use messages::SessionCommand;
pub use session::{ArSession, TickReport};
pub use shared_state::SensorHub;
