//! Screen anchor to world anchor, and the anchor lifecycle.

use nalgebra::{Isometry3, Point2, Point3};
use tracing::{debug, info};

use crate::config::PlacementConfig;
use crate::geometry::{normalize_degrees, Plane, Pose};
use crate::placement::anchor::{yaw_transform, Anchor, Indicator};
use crate::placement::camera::VirtualCamera;
use crate::tracking::TrackingResult;

/// Screen centre in normalised coordinates.
pub const SCREEN_CENTRE: Point2<f64> = Point2::new(0.5, 0.5);

pub struct Placement {
    config: PlacementConfig,
    ground: Plane,
    anchor: Anchor,
    indicator: Indicator,
    model_loaded: bool,
    yaw_degrees: f64,
}

impl Placement {
    pub fn new(config: PlacementConfig) -> Self {
        Self {
            config,
            ground: Plane::ground(),
            anchor: Anchor::default(),
            indicator: Indicator::default(),
            model_loaded: false,
            yaw_degrees: normalize_degrees(config.initial_yaw_degrees),
        }
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    pub fn is_placed(&self) -> bool {
        self.anchor.placed
    }

    pub fn model_loaded(&self) -> bool {
        self.model_loaded
    }

    pub fn yaw_degrees(&self) -> f64 {
        self.yaw_degrees
    }

    pub fn set_config(&mut self, config: PlacementConfig) {
        self.config = config;
    }

    pub fn set_model_loaded(&mut self, loaded: bool) {
        self.model_loaded = loaded;
    }

    /// Yaw for the next placement; a placed anchor turns with it.
    pub fn set_yaw_degrees(&mut self, degrees: f64) {
        self.yaw_degrees = normalize_degrees(degrees);
        if self.anchor.placed {
            self.anchor.rotation_y_degrees = self.yaw_degrees;
        }
    }

    /// Ground point under a screen position. A ray that misses the ground
    /// falls back to a point straight ahead of the camera.
    pub fn ground_point(&self, camera: &VirtualCamera, screen: &Point2<f64>) -> Point3<f64> {
        let ray = camera.screen_ray(screen);
        self.ground.intersect(&ray).unwrap_or_else(|| {
            debug!("anchor ray misses the ground plane");
            camera.position + camera.forward() * self.config.fallback_distance_m
        })
    }

    /// Ground point under a tracked pose. The pose offset is taken in the
    /// camera's level frame and dropped onto the ground plane.
    pub fn reference_point(&self, camera: &VirtualCamera, pose: &Pose) -> Point3<f64> {
        let world = camera.position + camera.heading() * pose.position;
        self.ground.project(&world)
    }

    /// Move the live indicator for this tick. Never places anything.
    ///
    /// `pose` is the smoothed tracker pose; without one the indicator sits
    /// under the tracker's screen hint, or the screen centre.
    pub fn update_indicator(
        &mut self,
        result: &TrackingResult,
        pose: Option<&Pose>,
        camera: &VirtualCamera,
    ) {
        if self.anchor.placed {
            self.indicator.visible = false;
            return;
        }
        self.indicator.visible = result.is_tracking;
        if result.is_tracking {
            self.indicator.position = match pose {
                Some(pose) => self.reference_point(camera, pose),
                None => {
                    let screen = result.screen_anchor.unwrap_or(SCREEN_CENTRE);
                    self.ground_point(camera, &screen)
                }
            };
        }
    }

    /// Pin the model under the tracked pose, or under the screen centre when
    /// nothing is tracked. `false` (and no change) if no model is loaded.
    pub fn place(&mut self, camera: &VirtualCamera, pose: Option<&Pose>) -> bool {
        if !self.model_loaded {
            debug!("place requested without a loaded model");
            return false;
        }
        let position = match pose {
            Some(pose) => self.reference_point(camera, pose),
            None => self.ground_point(camera, &SCREEN_CENTRE),
        };
        self.anchor = Anchor::placed_at(position, self.yaw_degrees);
        self.indicator.visible = false;
        info!(
            x = position.x,
            y = position.y,
            z = position.z,
            yaw = self.yaw_degrees,
            "model placed"
        );
        true
    }

    /// Unplace and hide everything. The model stays loaded.
    pub fn reset(&mut self) {
        self.anchor = Anchor::default();
        self.indicator = Indicator::default();
        self.yaw_degrees = normalize_degrees(self.config.initial_yaw_degrees);
    }

    /// Transform the renderer should apply to the model this tick, if it is
    /// shown at all.
    pub fn world_transform(&self) -> Option<Isometry3<f64>> {
        if self.anchor.placed {
            Some(self.anchor.transform())
        } else if self.indicator.visible {
            Some(yaw_transform(&self.indicator.position, self.yaw_degrees))
        } else {
            None
        }
    }
}
