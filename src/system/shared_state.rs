//! Latest-value sensor slots shared between sensor callbacks and the tick loop.
//!
//! Each slot has a single writer (its sensor callback) and is read by the
//! active tracker at tick boundaries. A sequence counter on the location slot
//! lets the reader tell whether a new fix arrived since it last looked.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::sensors::{LocationFix, OrientationSample};

/// Sensor state accessible by the callbacks and the active tracker.
#[derive(Default)]
pub struct SensorHub {
    orientation: RwLock<Option<OrientationSample>>,
    location: RwLock<Option<LocationFix>>,
    location_seq: AtomicU64,
}

impl SensorHub {
    /// Create an empty hub, ready to be handed to callbacks and trackers.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publish_orientation(&self, sample: OrientationSample) {
        *self.orientation.write() = Some(sample);
    }

    pub fn publish_location(&self, fix: LocationFix) {
        *self.location.write() = Some(fix);
        self.location_seq.fetch_add(1, Ordering::SeqCst);
    }

    pub fn latest_orientation(&self) -> Option<OrientationSample> {
        *self.orientation.read()
    }

    pub fn latest_location(&self) -> Option<LocationFix> {
        *self.location.read()
    }

    /// Number of location fixes published so far.
    pub fn location_seq(&self) -> u64 {
        self.location_seq.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_value_wins() {
        let hub = SensorHub::new();
        assert!(hub.latest_orientation().is_none());

        hub.publish_orientation(OrientationSample::new(10.0, 0.0, 0.0));
        hub.publish_orientation(OrientationSample::new(20.0, 0.0, 0.0));
        assert_eq!(hub.latest_orientation().unwrap().alpha, 20.0);
        assert_eq!(hub.location_seq(), 0);
    }

    #[test]
    fn test_location_sequence_counts_updates() {
        let hub = SensorHub::new();
        assert_eq!(hub.location_seq(), 0);
        hub.publish_location(LocationFix::new(37.0, -122.0, 5.0, 1000));
        assert_eq!(hub.location_seq(), 1);
        hub.publish_location(LocationFix::new(37.0, -122.0, 5.0, 1000));
        assert_eq!(hub.location_seq(), 2);
        assert_eq!(hub.latest_location().unwrap().timestamp_ms, 1000);
    }

    #[test]
    fn test_publish_from_another_thread() {
        let hub = SensorHub::new();
        let writer = Arc::clone(&hub);
        std::thread::spawn(move || {
            writer.publish_location(LocationFix::new(1.0, 2.0, 3.0, 4));
        })
        .join()
        .unwrap();
        assert_eq!(hub.latest_location().unwrap().longitude, 2.0);
    }
}
