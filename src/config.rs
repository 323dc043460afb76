//! Pipeline configuration.
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields the stock tuning. All values can be re-applied to a running
//! session through [`crate::system::ArSession::apply_config`].

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::tracking::BackendKind;

/// Top-level configuration, one section per pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Backend to use instead of the automatic preference order.
    pub backend: Option<BackendKind>,
    pub visual: VisualConfig,
    pub geodetic: GeodeticConfig,
    pub smoothing: SmoothingConfig,
    pub placement: PlacementConfig,
}

impl PipelineConfig {
    /// Load from a YAML file. Missing keys fall back to defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let config: PipelineConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }
}

/// Visual plane tracker tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// Keypoint cap per frame. Changing it recreates the detector.
    pub max_features: i32,
    /// RANSAC reprojection threshold in pixels.
    pub ransac_threshold: f64,
    /// Minimum surviving matches and homography inliers for a good tick.
    pub min_inliers: usize,
    /// Depth assumed for the tracked plane, in meters.
    pub assumed_depth_m: f64,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            max_features: 500,
            ransac_threshold: 3.0,
            min_inliers: 10,
            assumed_depth_m: 3.0,
        }
    }
}

/// Geodetic tracker tuning and the fixed target location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeodeticConfig {
    pub accuracy_threshold_m: f64,
    pub min_distance_m: f64,
    pub max_distance_m: f64,
    pub target: GeoTarget,
}

impl Default for GeodeticConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold_m: 50.0,
            min_distance_m: 5.0,
            max_distance_m: 1000.0,
            target: GeoTarget::default(),
        }
    }
}

/// Geodetic location the virtual object is pinned to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeoTarget {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// Pose smoothing noise parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub process_noise: f64,
    pub measurement_noise: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.01,
            measurement_noise: 0.1,
        }
    }
}

/// Placement behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Distance ahead of the camera used when the ray misses the ground plane.
    pub fallback_distance_m: f64,
    /// Yaw applied to a freshly placed anchor.
    pub initial_yaw_degrees: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            fallback_distance_m: 2.0,
            initial_yaw_degrees: 0.0,
        }
    }
}
