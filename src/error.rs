//! Error taxonomy for the tracking pipeline.
//!
//! Only [`InitError`] ever reaches callers as a hard failure. Everything in
//! [`TrackingError`] is produced on the per-tick path and folded into a
//! confidence decay by the backend that raised it.

use thiserror::Error;

/// Failure to bring a tracking backend up.
#[derive(Debug, Error)]
pub enum InitError {
    /// The host does not offer the capability this backend needs.
    #[error("capability not supported: {0}")]
    Unsupported(String),

    /// The user or host refused access to a sensor or session.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Configuration values that can never produce a working backend.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The backend was disposed and cannot be restarted in place.
    #[error("backend already disposed")]
    Disposed,

    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// Per-tick failure. Never fatal; see module docs.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("input unavailable: {0}")]
    InputUnavailable(&'static str),

    #[error("too few matches: {found} < {required}")]
    MatchingFailure { found: usize, required: usize },

    #[error("homography rejected: {inliers} inliers < {required}")]
    FitRejected { inliers: usize, required: usize },

    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}
