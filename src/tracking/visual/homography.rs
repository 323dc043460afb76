//! Robust homography fitting and the homography-to-pose approximation.

use nalgebra::{Matrix3, Vector3};
use opencv::calib3d;
use opencv::core::{Mat, Point2f, Vector};
use opencv::prelude::*;

use crate::tracking::visual::camera::CameraModel;

/// Homographies with |det| below this are treated as degenerate.
const MIN_DETERMINANT: f64 = 1e-8;

/// RANSAC homography with its inlier mask.
#[derive(Debug, Clone, PartialEq)]
pub struct HomographyFit {
    pub homography: Matrix3<f64>,
    pub inlier_mask: Vec<bool>,
    pub inlier_count: usize,
}

/// Fit `prev → curr` with RANSAC.
///
/// Returns `Ok(None)` when OpenCV gives up or the result is degenerate.
pub fn fit_homography(
    prev: &[Point2f],
    curr: &[Point2f],
    ransac_threshold: f64,
) -> opencv::Result<Option<HomographyFit>> {
    if prev.len() < 4 || prev.len() != curr.len() {
        return Ok(None);
    }
    let src = Vector::<Point2f>::from_slice(prev);
    let dst = Vector::<Point2f>::from_slice(curr);
    let mut mask = Mat::default();
    let h = calib3d::find_homography(&src, &dst, &mut mask, calib3d::RANSAC, ransac_threshold)?;
    if h.empty() {
        return Ok(None);
    }

    let homography = mat3_to_matrix3(&h)?;
    if !homography.iter().all(|v| v.is_finite()) || homography.determinant().abs() < MIN_DETERMINANT {
        return Ok(None);
    }

    let inlier_mask: Vec<bool> = if mask.empty() {
        vec![false; prev.len()]
    } else {
        mask.data_bytes()?.iter().map(|&b| b != 0).collect()
    };
    let inlier_count = inlier_mask.iter().filter(|&&b| b).count();

    Ok(Some(HomographyFit {
        homography,
        inlier_mask,
        inlier_count,
    }))
}

/// Approximate camera-relative offset of the plane from a homography.
///
/// The translation column, normalised by `h[2][2]`, is a pixel shift; dividing
/// by the focal length and scaling by the assumed depth turns it into meters.
/// The plane is put `depth_m` in front of the camera (−z). This is a coarse
/// placeholder, not a metric decomposition.
pub fn plane_offset(homography: &Matrix3<f64>, camera: &CameraModel, depth_m: f64) -> Vector3<f64> {
    let w = homography[(2, 2)];
    let scale = if w.abs() > f64::EPSILON { w } else { 1.0 };
    let tx = homography[(0, 2)] / scale;
    let ty = homography[(1, 2)] / scale;
    // Image y grows downward, world y grows upward.
    Vector3::new(tx / camera.fx * depth_m, -ty / camera.fy * depth_m, -depth_m)
}

/// Convert an OpenCV 3x3 `CV_64F` Mat to nalgebra.
fn mat3_to_matrix3(mat: &Mat) -> opencv::Result<Matrix3<f64>> {
    let mut m = Matrix3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            m[(r, c)] = *mat.at_2d::<f64>(r as i32, c as i32)?;
        }
    }
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> Vec<Point2f> {
        let mut pts = Vec::new();
        for i in 0..6 {
            for j in 0..5 {
                pts.push(Point2f::new(40.0 + 50.0 * i as f32, 30.0 + 45.0 * j as f32));
            }
        }
        pts
    }

    #[test]
    fn test_pure_translation_is_recovered() {
        let prev = grid();
        let curr: Vec<Point2f> = prev.iter().map(|p| Point2f::new(p.x + 12.0, p.y - 7.0)).collect();
        let fit = fit_homography(&prev, &curr, 3.0).unwrap().unwrap();
        assert_eq!(fit.inlier_count, prev.len());
        let h = fit.homography / fit.homography[(2, 2)];
        assert_relative_eq!(h[(0, 2)], 12.0, epsilon = 1e-3);
        assert_relative_eq!(h[(1, 2)], -7.0, epsilon = 1e-3);
        assert_relative_eq!(h[(0, 0)], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_outliers_are_rejected() {
        let prev = grid();
        let mut curr: Vec<Point2f> = prev.iter().map(|p| Point2f::new(p.x + 5.0, p.y)).collect();
        curr[0] = Point2f::new(300.0, 10.0);
        curr[7] = Point2f::new(5.0, 200.0);
        let fit = fit_homography(&prev, &curr, 3.0).unwrap().unwrap();
        assert_eq!(fit.inlier_count, prev.len() - 2);
        assert!(!fit.inlier_mask[0]);
        assert!(!fit.inlier_mask[7]);
    }

    #[test]
    fn test_too_few_points() {
        let prev = grid();
        assert!(fit_homography(&prev[..3], &prev[..3], 3.0).unwrap().is_none());
        assert!(fit_homography(&prev, &prev[..10], 3.0).unwrap().is_none());
    }

    #[test]
    fn test_identity_offset_is_straight_ahead() {
        let cam = CameraModel::approximate(640, 480);
        let offset = plane_offset(&Matrix3::identity(), &cam, 3.0);
        assert_eq!(offset, Vector3::new(0.0, 0.0, -3.0));
    }

    #[test]
    fn test_offset_scales_with_depth_over_focal() {
        let cam = CameraModel::approximate(640, 480);
        let mut h = Matrix3::identity();
        h[(0, 2)] = 64.0;
        h[(1, 2)] = 32.0;
        let offset = plane_offset(&h, &cam, 2.0);
        assert_relative_eq!(offset.x, 0.2, epsilon = 1e-12);
        assert_relative_eq!(offset.y, -0.1, epsilon = 1e-12);
        assert_eq!(offset.z, -2.0);
    }
}
