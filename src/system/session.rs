//! AR session: the per-tick pipeline tracker → smoothing → placement.
//!
//! The session is driven from a single thread; sensor callbacks publish into
//! the shared [`SensorHub`] and the UI sends [`SessionCommand`]s, both read
//! at tick boundaries.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use nalgebra::Isometry3;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::InitError;
use crate::filter::PoseSmoother;
use crate::geometry::Pose;
use crate::placement::{Anchor, Indicator, Placement, VirtualCamera};
use crate::tracking::hit_test::HitTestPlatform;
use crate::tracking::{
    select_backend, BackendKind, Capabilities, FrameInput, Tracker, TrackerStats, TrackingBackend,
    TrackingResult, TrackingState,
};

use super::messages::SessionCommand;
use super::shared_state::SensorHub;

/// Capacity of the UI command channel. Senders block briefly when full.
const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Everything the renderer needs after one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub result: TrackingResult,
    /// Pose after smoothing (or the raw pose for backends that skip it).
    pub smoothed_pose: Option<Pose>,
    pub indicator: Indicator,
    pub anchor: Anchor,
    pub world_transform: Option<Isometry3<f64>>,
    /// Outcome of a place command handled this tick.
    pub placed: Option<bool>,
}

pub struct ArSession {
    config: PipelineConfig,
    sensors: Arc<SensorHub>,
    tracker: Tracker,
    smoother: PoseSmoother,
    placement: Placement,
    /// Smoothed pose of the last tick that was tracking.
    last_pose: Option<Pose>,
    commands_tx: Sender<SessionCommand>,
    commands_rx: Receiver<SessionCommand>,
    disposed: bool,
}

impl ArSession {
    /// Select a backend from the reported capabilities, build it and initialise
    /// it. Initialisation failure is the only hard error a session reports.
    pub fn start(
        config: PipelineConfig,
        caps: Capabilities,
        sensors: Arc<SensorHub>,
        hit_test: Option<Box<dyn HitTestPlatform>>,
    ) -> Result<Self, InitError> {
        let kind = select_backend(&caps, config.backend)?;
        let mut tracker = Tracker::build(kind, &config, sensors.clone(), hit_test)?;
        tracker.init()?;

        let (commands_tx, commands_rx) = bounded(COMMAND_CHANNEL_CAPACITY);
        info!(backend = %kind, "AR session started");
        Ok(Self {
            smoother: PoseSmoother::new(config.smoothing),
            placement: Placement::new(config.placement),
            last_pose: None,
            config,
            sensors,
            tracker,
            commands_tx,
            commands_rx,
            disposed: false,
        })
    }

    /// Sender handed to the UI collaborator.
    pub fn commands(&self) -> Sender<SessionCommand> {
        self.commands_tx.clone()
    }

    pub fn sensors(&self) -> &Arc<SensorHub> {
        &self.sensors
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.tracker.kind()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn stats(&self) -> TrackerStats {
        self.tracker.stats()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Run one tick: drain commands, track, smooth, update placement.
    pub fn tick(&mut self, input: FrameInput<'_>, camera: &VirtualCamera) -> TickReport {
        if self.disposed {
            return self.report(
                TrackingResult::not_tracking(TrackingState::NoPriorFrame, 0.0),
                None,
                None,
            );
        }

        let placed = self.drain_commands(camera);

        let result = self.tracker.process_frame(input);
        let smoothed_pose = match result.pose {
            Some(pose) if self.tracker.wants_smoothing() => Some(self.smoother.filter(&pose)),
            other => other,
        };
        self.last_pose = smoothed_pose.filter(|_| result.is_tracking);
        self.placement
            .update_indicator(&result, self.last_pose.as_ref(), camera);

        debug!(
            state = ?result.state,
            confidence = result.confidence,
            placed = self.placement.is_placed(),
            "tick"
        );
        self.report(result, smoothed_pose, placed)
    }

    /// Place immediately, outside the command channel, under the last
    /// tracked pose.
    pub fn place(&mut self, camera: &VirtualCamera) -> bool {
        !self.disposed && self.placement.place(camera, self.last_pose.as_ref())
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.smoother.reset();
        self.placement.reset();
        self.last_pose = None;
        info!("session reset");
    }

    pub fn set_yaw_degrees(&mut self, degrees: f64) {
        self.placement.set_yaw_degrees(degrees);
    }

    pub fn set_model_loaded(&mut self, loaded: bool) {
        self.placement.set_model_loaded(loaded);
    }

    /// Re-apply every runtime knob. A different backend preference only
    /// takes effect on the next session.
    pub fn apply_config(&mut self, config: PipelineConfig) -> Result<(), InitError> {
        self.tracker.apply_config(&config)?;
        self.smoother.set_noise(config.smoothing);
        self.placement.set_config(config.placement);
        if config.backend.is_some_and(|kind| kind != self.tracker.kind()) {
            warn!("backend change requires a new session; keeping {}", self.tracker.kind());
        }
        self.config = config;
        Ok(())
    }

    /// Release the backend. Only the first call has an effect.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.tracker.dispose();
        self.smoother.reset();
        self.last_pose = None;
        self.disposed = true;
        info!("AR session disposed");
    }

    fn drain_commands(&mut self, camera: &VirtualCamera) -> Option<bool> {
        let mut placed = None;
        while let Ok(command) = self.commands_rx.try_recv() {
            match command {
                SessionCommand::Place => placed = Some(self.place(camera)),
                SessionCommand::Reset => self.reset(),
                SessionCommand::SetYawDegrees(degrees) => self.set_yaw_degrees(degrees),
                SessionCommand::ModelLoaded(loaded) => self.set_model_loaded(loaded),
                SessionCommand::UpdateConfig(config) => {
                    if let Err(err) = self.apply_config(*config) {
                        warn!(%err, "rejected configuration update");
                    }
                }
            }
        }
        placed
    }

    fn report(
        &self,
        result: TrackingResult,
        smoothed_pose: Option<Pose>,
        placed: Option<bool>,
    ) -> TickReport {
        TickReport {
            result,
            smoothed_pose,
            indicator: *self.placement.indicator(),
            anchor: *self.placement.anchor(),
            world_transform: self.placement.world_transform(),
            placed,
        }
    }
}

impl Drop for ArSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
