//! ORB feature storage and the two-slot frame arena.

use opencv::core::{KeyPoint, Mat, Scalar, Vector, CV_8UC1};
use opencv::prelude::*;

/// A set of ORB features extracted from an image.
pub struct FeatureSet {
    pub keypoints: Vector<KeyPoint>,
    pub descriptors: Mat,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            keypoints: Vector::new(),
            descriptors: Mat::default(),
        }
    }
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty() || self.descriptors.empty()
    }

    fn clear(&mut self) {
        self.keypoints.clear();
        self.descriptors = Mat::default();
    }
}

/// Grayscale buffer plus the features detected on it.
pub struct FrameSlot {
    pub gray: Mat,
    pub features: FeatureSet,
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self {
            gray: Mat::default(),
            features: FeatureSet::default(),
        }
    }
}

/// Frame history as two fixed slots indexed by a parity bit.
///
/// The slot at `parity` receives the current frame; the other one holds the
/// previous frame. [`FrameSlots::advance`] flips the bit, so buffers are
/// swapped by index and never aliased.
#[derive(Default)]
pub struct FrameSlots {
    slots: [FrameSlot; 2],
    parity: usize,
    has_previous: bool,
}

impl FrameSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release both buffers, then allocate fresh grayscale buffers of the
    /// given size. Previous-frame history is dropped.
    pub fn reallocate(&mut self, rows: i32, cols: i32) -> opencv::Result<()> {
        self.release();
        for slot in &mut self.slots {
            slot.gray = Mat::new_rows_cols_with_default(rows, cols, CV_8UC1, Scalar::all(0.0))?;
        }
        Ok(())
    }

    /// Current slot (mutable) and the previous one, if it holds a frame.
    pub fn split(&mut self) -> (&mut FrameSlot, Option<&FrameSlot>) {
        let has_previous = self.has_previous;
        let (first, second) = self.slots.split_at_mut(1);
        let (current, previous) = if self.parity == 0 {
            (&mut first[0], &second[0])
        } else {
            (&mut second[0], &first[0])
        };
        (current, has_previous.then_some(previous))
    }

    pub fn current(&self) -> &FrameSlot {
        &self.slots[self.parity]
    }

    pub fn previous(&self) -> Option<&FrameSlot> {
        self.has_previous.then(|| &self.slots[self.parity ^ 1])
    }

    /// End of tick: the current frame becomes the previous one.
    pub fn advance(&mut self) {
        self.parity ^= 1;
        self.has_previous = true;
        self.slots[self.parity].features.clear();
    }

    /// Forget history but keep the allocated buffers.
    pub fn invalidate(&mut self) {
        self.has_previous = false;
        self.parity = 0;
        for slot in &mut self.slots {
            slot.features.clear();
        }
    }

    /// Drop every native buffer.
    pub fn release(&mut self) {
        self.invalidate();
        for slot in &mut self.slots {
            slot.gray = Mat::default();
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.slots.iter().all(|s| !s.gray.empty())
    }

    pub fn has_previous(&self) -> bool {
        self.has_previous
    }
}
