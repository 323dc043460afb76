//! Rerun-based visualization for AR tracking and placement.
//!
//! Entity hierarchy:
//!     status               - Backend, tracking state and key counters
//!     camera/
//!         image            - Camera frame
//!         image/matches    - Inlier correspondences prev → curr (green lines)
//!         image/anchor     - Screen anchor hint (yellow dot)
//!     world/
//!         pose             - Smoothed tracker pose
//!         indicator        - Live placement indicator (cyan)
//!         anchor           - Placed anchor (orange box)
//!     plots/
//!         confidence       - Backend confidence
//!         feature_count    - Features / hits per tick
//!         distance_m       - Geodetic distance to target

use anyhow::{Context, Result};
use opencv::core::Mat;
use opencv::imgproc;
use opencv::prelude::*;
use rerun::{external::glam, RecordingStream};

use crate::system::TickReport;
use crate::tracking::{BackendKind, TrackingPayload, TrackingState};

pub struct RerunVisualizer {
    rec: RecordingStream,
    start_timestamp_ms: Option<u64>,
}

impl RerunVisualizer {
    pub fn new(app_name: &str) -> Result<Self> {
        // Runs rerun viewer in a separate process
        let rec = rerun::RecordingStreamBuilder::new(app_name)
            .spawn()
            .context("Failed to spawn rerun viewer")?;

        // Scene convention: +x right, +y up, camera looks down -z.
        rec.log_static("world", &rerun::ViewCoordinates::RUB()).ok();

        Ok(Self {
            rec,
            start_timestamp_ms: None,
        })
    }

    /// Set the current timestamp for all subsequent logs, relative to the
    /// first tick.
    pub fn set_time(&mut self, timestamp_ms: u64) {
        let start_ms = *self.start_timestamp_ms.get_or_insert(timestamp_ms);
        let relative_sec = timestamp_ms.saturating_sub(start_ms) as f64 / 1e3;
        self.rec.set_duration_secs("time", relative_sec);
    }

    pub fn log_status(&self, backend: BackendKind, report: &TickReport) {
        let state = match report.result.state {
            TrackingState::Tracked => "**TRACKED**",
            TrackingState::FeaturesDetected => "**SEARCHING**",
            TrackingState::LostTrack => "**LOST**",
            TrackingState::NoPriorFrame => "**INIT**",
        };
        let placement = if report.anchor.placed {
            "placed"
        } else if report.indicator.visible {
            "previewing"
        } else {
            "hidden"
        };
        let text = format!(
            "{} | Backend: {} | Confidence: {:.2} | Features: {} | Planes: {} | Model: {}",
            state,
            backend,
            report.result.confidence,
            report.result.feature_count,
            report.result.plane_count,
            placement,
        );
        self.rec
            .log(
                "status",
                &rerun::TextDocument::new(text).with_media_type(rerun::MediaType::markdown()),
            )
            .ok();
    }

    /// Log the camera frame. Grayscale and BGR frames are supported.
    pub fn log_image_feed(&self, image: &Mat) {
        match image.channels() {
            1 => {
                if let Ok((data, width, height)) = mat_to_image_data(image) {
                    self.rec
                        .log("camera/image", &rerun::Image::from_l8(data, [width, height]))
                        .ok();
                }
            }
            3 => {
                let mut rgb = Mat::default();
                if imgproc::cvt_color_def(image, &mut rgb, imgproc::COLOR_BGR2RGB).is_err() {
                    return;
                }
                if let Ok((data, width, height)) = mat_to_image_data(&rgb) {
                    self.rec
                        .log("camera/image", &rerun::Image::from_rgb24(data, [width, height]))
                        .ok();
                }
            }
            _ => {}
        }
    }

    /// Matches and the screen anchor hint over the image.
    pub fn log_image_overlays(&self, report: &TickReport, width: u32, height: u32) {
        if let TrackingPayload::Visual { matches, .. } = &report.result.payload {
            let strips: Vec<[[f32; 2]; 2]> = matches
                .iter()
                .map(|m| [[m.prev.x, m.prev.y], [m.curr.x, m.curr.y]])
                .collect();
            self.rec
                .log(
                    "camera/image/matches",
                    &rerun::LineStrips2D::new(strips)
                        .with_colors([[0u8, 255, 0]])
                        .with_radii([1.0f32]),
                )
                .ok();
        }

        if let Some(anchor) = report.result.screen_anchor {
            let px = [
                (anchor.x * width as f64) as f32,
                (anchor.y * height as f64) as f32,
            ];
            self.rec
                .log(
                    "camera/image/anchor",
                    &rerun::Points2D::new([px])
                        .with_colors([[255u8, 220, 0]])
                        .with_radii([6.0f32]),
                )
                .ok();
        }
    }

    /// Pose, indicator and anchor in the scene.
    pub fn log_world(&self, report: &TickReport) {
        if let Some(pose) = &report.smoothed_pose {
            let q = pose.orientation();
            let translation = glam::Vec3::new(
                pose.position.x as f32,
                pose.position.y as f32,
                pose.position.z as f32,
            );
            let rotation = glam::Quat::from_xyzw(
                q.coords.x as f32,
                q.coords.y as f32,
                q.coords.z as f32,
                q.w as f32,
            );
            self.rec
                .log(
                    "world/pose",
                    &rerun::Transform3D::from_translation_rotation(translation, rotation),
                )
                .ok();
        }

        if report.indicator.visible {
            let p = report.indicator.position;
            self.rec
                .log(
                    "world/indicator",
                    &rerun::Points3D::new([[p.x as f32, p.y as f32, p.z as f32]])
                        .with_colors([[0u8, 220, 255]])
                        .with_radii([0.05f32]),
                )
                .ok();
        } else {
            self.rec.log("world/indicator", &rerun::Clear::flat()).ok();
        }

        if report.anchor.placed {
            let p = report.anchor.world_position;
            self.rec
                .log(
                    "world/anchor",
                    &rerun::Boxes3D::from_centers_and_sizes(
                        [[p.x as f32, p.y as f32 + 0.1, p.z as f32]],
                        [[0.2f32, 0.2, 0.2]],
                    )
                    .with_colors([[255u8, 140, 0]]),
                )
                .ok();
        } else {
            self.rec.log("world/anchor", &rerun::Clear::flat()).ok();
        }
    }

    pub fn log_temporal_plots(&self, report: &TickReport) {
        self.rec
            .log(
                "plots/confidence",
                &rerun::Scalars::new([report.result.confidence]),
            )
            .ok();
        self.rec
            .log(
                "plots/feature_count",
                &rerun::Scalars::new([report.result.feature_count as f64]),
            )
            .ok();
        if let TrackingPayload::Geodetic { distance_m, .. } = report.result.payload {
            self.rec
                .log("plots/distance_m", &rerun::Scalars::new([distance_m]))
                .ok();
        }
    }
}

/// Convert a continuous 8-bit Mat to (bytes, width, height).
fn mat_to_image_data(mat: &Mat) -> Result<(Vec<u8>, u32, u32), opencv::Error> {
    let rows = mat.rows() as u32;
    let cols = mat.cols() as u32;
    let data = mat.data_bytes()?.to_vec();
    Ok((data, cols, rows))
}
