use nalgebra::Point2;

/// Pinhole intrinsics approximated from the frame size alone.
///
/// With no calibration available the focal length is taken as the frame
/// width (`fx = fy = width`), the principal point sits at the frame centre and
/// lens distortion is ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
}

impl CameraModel {
    pub fn approximate(width: u32, height: u32) -> Self {
        let w = width as f64;
        let h = height as f64;
        Self {
            fx: w,
            fy: w,
            cx: w / 2.0,
            cy: h / 2.0,
            width,
            height,
        }
    }

    pub fn same_size(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Pixel coordinates to `[0, 1]` screen coordinates.
    pub fn normalize(&self, pixel: &Point2<f64>) -> Point2<f64> {
        Point2::new(pixel.x / self.width as f64, pixel.y / self.height as f64)
    }
}
