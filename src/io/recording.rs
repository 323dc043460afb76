//! Recorded AR session on disk.
//!
//! Layout of a recording directory (all CSVs header-less, `#` comments):
//! - `frames.csv`: `timestamp_ms, filename`, images under `frames/`
//! - `orientation.csv`: `timestamp_ms, alpha, beta, gamma` (degrees)
//! - `location.csv`: `timestamp_ms, latitude, longitude, altitude, accuracy_m`
//!   with an empty altitude field when the fix has none
//!
//! Every file is optional, but a recording needs frames or locations.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use opencv::imgcodecs::{self, IMREAD_COLOR};
use opencv::prelude::*;
use tracing::warn;

use crate::sensors::{LocationFix, OrientationSample};
use crate::tracking::Capabilities;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameEntry {
    pub timestamp_ms: u64,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationEntry {
    pub timestamp_ms: u64,
    pub sample: OrientationSample,
}

#[derive(Debug)]
pub struct Recording {
    root: PathBuf,
    pub frames: Vec<FrameEntry>,
    pub orientation: Vec<OrientationEntry>,
    pub locations: Vec<LocationFix>,
}

impl Recording {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            bail!("{} is not a directory", root.display());
        }

        let frames = load_optional(&root.join("frames.csv"), load_frame_list)?;
        let orientation = load_optional(&root.join("orientation.csv"), load_orientation_list)?;
        let locations = load_optional(&root.join("location.csv"), load_location_list)?;

        if frames.is_empty() && locations.is_empty() {
            bail!("{} has neither frames nor locations", root.display());
        }

        Ok(Self {
            root,
            frames,
            orientation,
            locations,
        })
    }

    /// What a live host would have offered for this recording.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            camera: !self.frames.is_empty(),
            hit_test: false,
            geolocation: !self.locations.is_empty(),
        }
    }

    /// Tick timestamps: one per frame, or one per fix for camera-less
    /// recordings.
    pub fn timeline(&self) -> Vec<u64> {
        if self.frames.is_empty() {
            self.locations.iter().map(|l| l.timestamp_ms).collect()
        } else {
            self.frames.iter().map(|f| f.timestamp_ms).collect()
        }
    }

    pub fn load_frame(&self, idx: usize) -> Result<Mat> {
        let entry = self
            .frames
            .get(idx)
            .with_context(|| format!("No frame at index {}", idx))?;
        let path = self.root.join("frames").join(&entry.filename);
        let path_str = path
            .to_str()
            .with_context(|| format!("Non UTF-8 path {:?}", path))?;
        let image = imgcodecs::imread(path_str, IMREAD_COLOR)
            .with_context(|| format!("Failed to read image {:?}", path))?;
        if image.empty() {
            bail!("Image {:?} is missing or could not be decoded", path);
        }
        Ok(image)
    }

    /// Orientation samples with `after < timestamp <= until`.
    pub fn orientation_between(&self, after: Option<u64>, until: u64) -> &[OrientationEntry] {
        let start = after.map_or(0, |t| {
            self.orientation.partition_point(|e| e.timestamp_ms <= t)
        });
        let end = self.orientation.partition_point(|e| e.timestamp_ms <= until);
        &self.orientation[start..end.max(start)]
    }

    /// Location fixes with `after < timestamp <= until`.
    pub fn locations_between(&self, after: Option<u64>, until: u64) -> &[LocationFix] {
        let start = after.map_or(0, |t| {
            self.locations.partition_point(|e| e.timestamp_ms <= t)
        });
        let end = self.locations.partition_point(|e| e.timestamp_ms <= until);
        &self.locations[start..end.max(start)]
    }
}

fn load_optional<T: Timestamped>(
    path: &Path,
    load: fn(&Path) -> Result<Vec<T>>,
) -> Result<Vec<T>> {
    if !path.exists() {
        warn!("{} not found, continuing without it", path.display());
        return Ok(Vec::new());
    }
    let mut entries = load(path)?;
    entries.sort_by_key(|e| e.timestamp_ms());
    Ok(entries)
}

fn records(csv_path: &Path) -> Result<Vec<StringRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_path(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        out.push(rec.with_context(|| format!("Malformed row in {}", csv_path.display()))?);
    }
    Ok(out)
}

fn load_frame_list(csv_path: &Path) -> Result<Vec<FrameEntry>> {
    let mut entries = Vec::new();
    for rec in records(csv_path)? {
        if rec.len() < 2 {
            continue;
        }
        entries.push(FrameEntry {
            timestamp_ms: rec[0].trim().parse()?,
            filename: rec[1].trim().to_string(),
        });
    }
    Ok(entries)
}

fn load_orientation_list(csv_path: &Path) -> Result<Vec<OrientationEntry>> {
    let mut entries = Vec::new();
    for rec in records(csv_path)? {
        if rec.len() < 4 {
            continue;
        }
        entries.push(OrientationEntry {
            timestamp_ms: rec[0].trim().parse()?,
            sample: OrientationSample::new(
                rec[1].trim().parse()?,
                rec[2].trim().parse()?,
                rec[3].trim().parse()?,
            ),
        });
    }
    Ok(entries)
}

fn load_location_list(csv_path: &Path) -> Result<Vec<LocationFix>> {
    let mut entries = Vec::new();
    for rec in records(csv_path)? {
        if rec.len() < 5 {
            continue;
        }
        let altitude = match rec[3].trim() {
            "" => None,
            value => Some(value.parse()?),
        };
        entries.push(LocationFix {
            timestamp_ms: rec[0].trim().parse()?,
            latitude: rec[1].trim().parse()?,
            longitude: rec[2].trim().parse()?,
            altitude,
            accuracy_m: rec[4].trim().parse()?,
        });
    }
    Ok(entries)
}

trait Timestamped {
    fn timestamp_ms(&self) -> u64;
}

impl Timestamped for FrameEntry {
    fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

impl Timestamped for OrientationEntry {
    fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

impl Timestamped for LocationFix {
    fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}
