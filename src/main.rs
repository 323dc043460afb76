use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use opencv::core::Mat;
#[cfg(feature = "viz")]
use opencv::prelude::*;
use tracing::{info, warn};

use ar_placement::config::PipelineConfig;
use ar_placement::io::Recording;
use ar_placement::placement::VirtualCamera;
use ar_placement::system::{ArSession, SensorHub, SessionCommand};
use ar_placement::tracking::{BackendKind, FrameInput};

/// Consecutive tracked ticks before auto-place fires.
const STABLE_TICKS: usize = 10;

#[derive(Parser)]
#[command(name = "ar-replay")]
#[command(about = "Replay a recorded AR session through tracking and placement")]
#[command(version)]
struct Cli {
    /// Recording directory (frames.csv, orientation.csv, location.csv).
    recording: PathBuf,

    /// Pipeline configuration (YAML). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force a backend instead of picking one from the recording.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Place the model once tracking has been stable for a while.
    #[arg(long)]
    auto_place: bool,

    /// Yaw of the placed model, degrees.
    #[arg(long)]
    yaw: Option<f64>,

    /// Stream the session to a Rerun viewer (needs the `viz` feature).
    #[arg(long)]
    viz: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Visual,
    Geodetic,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Visual => BackendKind::Visual,
            BackendArg::Geodetic => BackendKind::Geodetic,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("Loading recording from: {}", cli.recording.display());
    let recording = Recording::open(&cli.recording)?;
    info!(
        "Loaded {} frames, {} orientation samples, {} location fixes",
        recording.frames.len(),
        recording.orientation.len(),
        recording.locations.len()
    );

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = Some(backend.into());
    }

    let sensors = SensorHub::new();
    let mut session = ArSession::start(config, recording.capabilities(), sensors.clone(), None)
        .context("Failed to start AR session")?;
    // Replay has no asset pipeline; the model counts as loaded.
    session.set_model_loaded(true);
    if let Some(yaw) = cli.yaw {
        session.set_yaw_degrees(yaw);
    }
    let commands = session.commands();
    let camera = VirtualCamera::default();

    #[cfg(feature = "viz")]
    let mut viz = if cli.viz {
        Some(ar_placement::viz::RerunVisualizer::new("ar-replay")?)
    } else {
        None
    };
    #[cfg(not(feature = "viz"))]
    if cli.viz {
        warn!("built without the `viz` feature, ignoring --viz");
    }

    let uses_frames = session.backend_kind() == BackendKind::Visual;
    let empty = Mat::default();
    let mut previous_ts = None;
    let mut stable_ticks = 0usize;

    for (i, &ts) in recording.timeline().iter().enumerate() {
        for entry in recording.orientation_between(previous_ts, ts) {
            sensors.publish_orientation(entry.sample);
        }
        for fix in recording.locations_between(previous_ts, ts) {
            sensors.publish_location(*fix);
        }
        previous_ts = Some(ts);

        let frame = if uses_frames {
            match recording.load_frame(i) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!("Skipping frame {}: {:#}", i, e);
                    None
                }
            }
        } else {
            None
        };
        let input = match (uses_frames, &frame) {
            (true, Some(frame)) => FrameInput::Image(frame),
            (true, None) => FrameInput::Image(&empty),
            (false, _) => FrameInput::Sensors,
        };

        let report = session.tick(input, &camera);

        if report.placed == Some(true) {
            let p = report.anchor.world_position;
            info!(
                "Model placed at tick {} (ts={}): [{:.2}, {:.2}, {:.2}]",
                i, ts, p.x, p.y, p.z
            );
        }

        if report.result.is_tracking {
            stable_ticks += 1;
        } else {
            stable_ticks = 0;
        }
        if cli.auto_place && !report.anchor.placed && stable_ticks == STABLE_TICKS {
            commands
                .send(SessionCommand::Place)
                .context("Session command channel closed")?;
        }

        #[cfg(feature = "viz")]
        if let Some(viz) = viz.as_mut() {
            viz.set_time(ts);
            viz.log_status(session.backend_kind(), &report);
            if let Some(frame) = &frame {
                viz.log_image_feed(frame);
                viz.log_image_overlays(&report, frame.cols() as u32, frame.rows() as u32);
            }
            viz.log_world(&report);
            viz.log_temporal_plots(&report);
        }

        if i % 100 == 0 {
            info!(
                "Tick {} (ts={}): state={:?} confidence={:.2} features={}",
                i,
                ts,
                report.result.state,
                report.result.confidence,
                report.result.feature_count
            );
        }
    }

    let stats = session.stats();
    info!(
        "Replay finished: {} ticks, {} successful, {} failed, placed={}",
        stats.ticks,
        stats.successful_ticks,
        stats.failed_ticks,
        session.placement().is_placed()
    );
    session.dispose();
    Ok(())
}
