//! Backend selection and the tagged enum holding the active backend.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::InitError;
use crate::system::shared_state::SensorHub;
use crate::tracking::geodetic::GeodeticTracker;
use crate::tracking::hit_test::{HitTestPlatform, HitTestTracker};
use crate::tracking::result::{TrackerStats, TrackingResult};
use crate::tracking::visual::VisualPlaneTracker;
use crate::tracking::{FrameInput, TrackingBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    HitTest,
    Visual,
    Geodetic,
}

impl BackendKind {
    /// Preference order when the caller expresses none.
    pub const PREFERENCE: [BackendKind; 3] = [Self::HitTest, Self::Visual, Self::Geodetic];

    pub fn is_available(&self, caps: &Capabilities) -> bool {
        match self {
            Self::HitTest => caps.hit_test,
            Self::Visual => caps.camera,
            Self::Geodetic => caps.geolocation,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HitTest => "hit-test",
            Self::Visual => "visual",
            Self::Geodetic => "geodetic",
        };
        f.write_str(name)
    }
}

/// What the host can offer, queried once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub camera: bool,
    pub hit_test: bool,
    pub geolocation: bool,
}

/// Choose the backend for this session.
///
/// A preferred kind is honoured only if the host supports it; otherwise the
/// first available kind in [`BackendKind::PREFERENCE`] wins.
pub fn select_backend(
    caps: &Capabilities,
    preferred: Option<BackendKind>,
) -> Result<BackendKind, InitError> {
    if let Some(kind) = preferred {
        return if kind.is_available(caps) {
            Ok(kind)
        } else {
            Err(InitError::Unsupported(kind.to_string()))
        };
    }
    BackendKind::PREFERENCE
        .into_iter()
        .find(|kind| kind.is_available(caps))
        .ok_or_else(|| InitError::Unsupported("no tracking capability available".into()))
}

/// The active backend. Switching kinds means building a new `Tracker`.
pub enum Tracker {
    Visual(VisualPlaneTracker),
    HitTest(HitTestTracker),
    Geodetic(GeodeticTracker),
}

impl Tracker {
    /// Construct (but do not initialise) a backend of the given kind.
    pub fn build(
        kind: BackendKind,
        config: &PipelineConfig,
        sensors: Arc<SensorHub>,
        hit_test: Option<Box<dyn HitTestPlatform>>,
    ) -> Result<Self, InitError> {
        let tracker = match kind {
            BackendKind::Visual => {
                Self::Visual(VisualPlaneTracker::new(config.visual.clone(), sensors))
            }
            BackendKind::HitTest => {
                let platform =
                    hit_test.ok_or_else(|| InitError::Unsupported("no hit-test platform".into()))?;
                Self::HitTest(HitTestTracker::new(platform, sensors))
            }
            BackendKind::Geodetic => {
                Self::Geodetic(GeodeticTracker::new(config.geodetic.clone(), sensors))
            }
        };
        info!(backend = %kind, "tracking backend selected");
        Ok(tracker)
    }

    /// Push runtime knobs down to the backend that uses them.
    pub fn apply_config(&mut self, config: &PipelineConfig) -> Result<(), InitError> {
        match self {
            Self::Visual(t) => t.set_config(config.visual.clone()),
            Self::Geodetic(t) => t.set_config(config.geodetic.clone()),
            Self::HitTest(_) => Ok(()),
        }
    }

    fn backend(&self) -> &dyn TrackingBackend {
        match self {
            Self::Visual(t) => t,
            Self::HitTest(t) => t,
            Self::Geodetic(t) => t,
        }
    }

    fn backend_mut(&mut self) -> &mut dyn TrackingBackend {
        match self {
            Self::Visual(t) => t,
            Self::HitTest(t) => t,
            Self::Geodetic(t) => t,
        }
    }
}

impl TrackingBackend for Tracker {
    fn kind(&self) -> BackendKind {
        self.backend().kind()
    }

    fn init(&mut self) -> Result<(), InitError> {
        self.backend_mut().init()
    }

    fn process_frame(&mut self, input: FrameInput<'_>) -> TrackingResult {
        self.backend_mut().process_frame(input)
    }

    fn reset(&mut self) {
        self.backend_mut().reset()
    }

    fn dispose(&mut self) {
        self.backend_mut().dispose()
    }

    fn wants_smoothing(&self) -> bool {
        self.backend().wants_smoothing()
    }

    fn stats(&self) -> TrackerStats {
        self.backend().stats()
    }
}
