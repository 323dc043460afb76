//! Temporal feature matching between consecutive frames.

use opencv::core::{DMatch, Mat, Vector};
use opencv::features2d::BFMatcher;
use opencv::prelude::*;

use crate::tracking::visual::features::FeatureSet;

/// Matches at or above this Hamming distance are always rejected.
pub const DISTANCE_FLOOR: f32 = 30.0;
/// Cutoff relative to the best match in the set.
pub const DISTANCE_MULTIPLIER: f32 = 3.0;

/// Brute-force Hamming matcher with cross-check, so every match is mutual
/// and one-to-one.
pub struct TemporalMatcher {
    matcher: BFMatcher,
}

impl TemporalMatcher {
    pub fn new() -> opencv::Result<Self> {
        let matcher = BFMatcher::new(opencv::core::NORM_HAMMING, true)?;
        Ok(Self { matcher })
    }

    /// Match `prev` (query) against `curr` (train) and keep only confident
    /// matches, see [`filter_by_distance`].
    pub fn match_features(&self, prev: &FeatureSet, curr: &FeatureSet) -> opencv::Result<Vec<DMatch>> {
        if prev.is_empty() || curr.is_empty() {
            return Ok(Vec::new());
        }
        let mut matches = Vector::<DMatch>::new();
        self.matcher.train_match(
            &prev.descriptors,
            &curr.descriptors,
            &mut matches,
            &Mat::default(),
        )?;
        Ok(filter_by_distance(&matches.to_vec()))
    }
}

/// Distance cutoff for a set whose best match scored `min_distance`.
pub fn distance_cutoff(min_distance: f32) -> f32 {
    (DISTANCE_MULTIPLIER * min_distance).max(DISTANCE_FLOOR)
}

/// Keep matches with distance strictly below `max(3 × best, 30)`.
pub fn filter_by_distance(matches: &[DMatch]) -> Vec<DMatch> {
    let Some(min_distance) = matches.iter().map(|m| m.distance).reduce(f32::min) else {
        return Vec::new();
    };
    let cutoff = distance_cutoff(min_distance);
    matches
        .iter()
        .filter(|m| m.distance < cutoff)
        .copied()
        .collect()
}
