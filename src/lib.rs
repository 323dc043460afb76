pub mod config;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod io;
pub mod placement;
pub mod sensors;
pub mod system;
pub mod tracking;
#[cfg(feature = "viz")]
pub mod viz;
