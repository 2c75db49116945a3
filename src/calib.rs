// SPDX-License-Identifier: Apache-2.0

//! Camera calibration: pinhole intrinsics, sensor extrinsics, and the
//! per-device calibration bundle.
//!
//! Intrinsics map pixel coordinates to 3D rays through the pinhole model
//! with Brown-Conrady distortion. Extrinsics relate the depth and color
//! sensor frames; the rotation matrix is stored column-major, matching the
//! layout the RealSense firmware reports.

use crate::camera::{Error, Resolution};

/// Pinhole camera intrinsics with Brown-Conrady distortion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intrinsics {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Focal length x
    pub fx: f32,
    /// Focal length y
    pub fy: f32,
    /// Principal point x
    pub cx: f32,
    /// Principal point y
    pub cy: f32,
    /// Distortion coefficients `[k1, k2, p1, p2, k3]`
    pub distortion: [f32; 5],
}

impl Intrinsics {
    /// Undistorted intrinsics with the principal point at the image center
    /// and a focal length equal to the image width.
    pub fn ideal(resolution: Resolution) -> Self {
        Self {
            width: resolution.width,
            height: resolution.height,
            fx: resolution.width as f32,
            fy: resolution.width as f32,
            cx: resolution.width as f32 / 2.0,
            cy: resolution.height as f32 / 2.0,
            distortion: [0.0; 5],
        }
    }

    /// Back-project a pixel with depth into the camera frame.
    ///
    /// Uses the pinhole model: `(col - cx) / fx = X / Z`.
    /// Returns `[x, y, z]` in the same unit as `depth`.
    pub fn deproject(&self, col: f32, row: f32, depth: f32) -> [f32; 3] {
        let x = (col - self.cx) / self.fx * depth;
        let y = (row - self.cy) / self.fy * depth;
        [x, y, depth]
    }

    /// Project a camera-frame point onto the image plane, applying
    /// distortion. Returns `None` for points at or behind the camera.
    ///
    /// The returned coordinates are continuous pixel positions and may fall
    /// outside the image bounds; the caller decides whether to clamp.
    pub fn project(&self, point: [f32; 3]) -> Option<(f32, f32)> {
        if point[2] <= 0.0 {
            return None;
        }

        let xn = point[0] / point[2];
        let yn = point[1] / point[2];
        let (xd, yd) = self.distort(xn, yn);

        Some((xd * self.fx + self.cx, yd * self.fy + self.cy))
    }

    /// Apply Brown-Conrady distortion to normalized image coordinates.
    fn distort(&self, xn: f32, yn: f32) -> (f32, f32) {
        let [k1, k2, p1, p2, k3] = self.distortion;

        let r2 = xn * xn + yn * yn;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = 1.0 + k1 * r2 + k2 * r4 + k3 * r6;

        let tangential_x = 2.0 * p1 * xn * yn + p2 * (r2 + 2.0 * xn * xn);
        let tangential_y = p1 * (r2 + 2.0 * yn * yn) + 2.0 * p2 * xn * yn;

        (xn * radial + tangential_x, yn * radial + tangential_y)
    }
}

/// Rigid transform between two sensor frames.
///
/// `rotation` is a 3x3 matrix in column-major order; `translation` is in
/// meters. This matches the `rs2_extrinsics` layout reported by the
/// RealSense firmware.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extrinsics {
    pub rotation: [f32; 9],
    pub translation: [f32; 3],
}

impl Extrinsics {
    /// Identity transform (coincident sensor frames).
    pub fn identity() -> Self {
        Self {
            rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            translation: [0.0; 3],
        }
    }

    /// Apply the transform to a point: `R * p + t`.
    pub fn transform(&self, p: [f32; 3]) -> [f32; 3] {
        let r = &self.rotation;
        [
            r[0] * p[0] + r[3] * p[1] + r[6] * p[2] + self.translation[0],
            r[1] * p[0] + r[4] * p[1] + r[7] * p[2] + self.translation[1],
            r[2] * p[0] + r[5] * p[1] + r[8] * p[2] + self.translation[2],
        ]
    }
}

/// Calibration bundle for one depth + color stream pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    /// Depth sensor intrinsics
    pub depth: Intrinsics,
    /// Color sensor intrinsics
    pub color: Intrinsics,
    /// Transform from the depth frame into the color frame
    pub depth_to_color: Extrinsics,
    /// Meters per depth unit (0.001 for millimeter devices)
    pub depth_scale: f32,
}

impl Calibration {
    /// Synthetic calibration: ideal intrinsics for both sensors, identity
    /// extrinsics, millimeter depth units. Used by synthetic sources and
    /// tests.
    pub fn ideal(resolution: Resolution) -> Self {
        Self {
            depth: Intrinsics::ideal(resolution),
            color: Intrinsics::ideal(resolution),
            depth_to_color: Extrinsics::identity(),
            depth_scale: 0.001,
        }
    }

    /// Reject calibrations that cannot back a projection.
    pub fn validate(&self) -> Result<(), Error> {
        if self.depth.width == 0 || self.depth.height == 0 {
            return Err(Error::Projection(format!(
                "zero-sized depth sensor: {}x{}",
                self.depth.width, self.depth.height
            )));
        }
        if self.color.width == 0 || self.color.height == 0 {
            return Err(Error::Projection(format!(
                "zero-sized color sensor: {}x{}",
                self.color.width, self.color.height
            )));
        }
        if self.depth.fx <= 0.0 || self.depth.fy <= 0.0 {
            return Err(Error::Projection(format!(
                "non-positive depth focal length: fx={} fy={}",
                self.depth.fx, self.depth.fy
            )));
        }
        if self.color.fx <= 0.0 || self.color.fy <= 0.0 {
            return Err(Error::Projection(format!(
                "non-positive color focal length: fx={} fy={}",
                self.color.fx, self.color.fy
            )));
        }
        if self.depth_scale <= 0.0 {
            return Err(Error::Projection(format!(
                "non-positive depth scale: {}",
                self.depth_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deproject_principal_point() {
        let intr = Intrinsics::ideal(Resolution::new(640, 480));
        let p = intr.deproject(320.0, 240.0, 2.0);
        assert_eq!(p, [0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_deproject_pinhole() {
        // fx = 640, so one focal length off-center at z=1 gives x=1
        let intr = Intrinsics::ideal(Resolution::new(640, 480));
        let p = intr.deproject(960.0, 240.0, 1.0);
        assert!((p[0] - 1.0).abs() < 1e-6);
        assert!(p[1].abs() < 1e-6);
    }

    #[test]
    fn test_project_deproject_roundtrip() {
        let intr = Intrinsics::ideal(Resolution::new(640, 480));
        let p = intr.deproject(100.5, 381.25, 3.2);
        let (col, row) = intr.project(p).unwrap();
        assert!((col - 100.5).abs() < 1e-3);
        assert!((row - 381.25).abs() < 1e-3);
    }

    #[test]
    fn test_project_behind_camera() {
        let intr = Intrinsics::ideal(Resolution::new(640, 480));
        assert!(intr.project([0.1, 0.1, -1.0]).is_none());
        assert!(intr.project([0.1, 0.1, 0.0]).is_none());
    }

    #[test]
    fn test_distortion_at_center_is_zero() {
        let mut intr = Intrinsics::ideal(Resolution::new(640, 480));
        intr.distortion = [0.058, 0.024, 0.001, 0.002, -0.27];
        // The optical axis is unaffected by radial distortion
        let (col, row) = intr.project([0.0, 0.0, 1.0]).unwrap();
        assert!((col - intr.cx).abs() < 1e-4);
        assert!((row - intr.cy).abs() < 1e-4);
    }

    #[test]
    fn test_radial_distortion_pushes_outward() {
        let mut intr = Intrinsics::ideal(Resolution::new(640, 480));
        intr.distortion = [0.1, 0.0, 0.0, 0.0, 0.0];
        let (undist, _) = Intrinsics::ideal(Resolution::new(640, 480))
            .project([0.5, 0.0, 1.0])
            .unwrap();
        let (dist, _) = intr.project([0.5, 0.0, 1.0]).unwrap();
        // Positive k1 moves points away from the principal point
        assert!(dist > undist);
    }

    #[test]
    fn test_extrinsics_identity() {
        let ext = Extrinsics::identity();
        let p = [1.0, -2.0, 3.0];
        assert_eq!(ext.transform(p), p);
    }

    #[test]
    fn test_extrinsics_translation() {
        let ext = Extrinsics {
            rotation: Extrinsics::identity().rotation,
            translation: [0.015, -0.002, 0.0],
        };
        let p = ext.transform([1.0, 1.0, 1.0]);
        assert!((p[0] - 1.015).abs() < 1e-6);
        assert!((p[1] - 0.998).abs() < 1e-6);
        assert!((p[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_extrinsics_rotation_column_major() {
        // 90 degree rotation about z, column-major: maps +x to +y
        let ext = Extrinsics {
            rotation: [0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            translation: [0.0; 3],
        };
        let p = ext.transform([1.0, 0.0, 0.0]);
        assert!(p[0].abs() < 1e-6);
        assert!((p[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_calibration_validation() {
        let calib = Calibration::ideal(Resolution::new(640, 480));
        assert!(calib.validate().is_ok());

        let mut bad = calib;
        bad.depth.fx = 0.0;
        assert!(matches!(bad.validate(), Err(Error::Projection(_))));

        let mut bad = calib;
        bad.depth_scale = -1.0;
        assert!(matches!(bad.validate(), Err(Error::Projection(_))));
    }

    #[test]
    fn test_zero_sized_sensor_rejected() {
        let calib = Calibration::ideal(Resolution::new(640, 480));

        let mut bad = calib;
        bad.color.width = 0;
        assert!(matches!(bad.validate(), Err(Error::Projection(_))));

        let mut bad = calib;
        bad.color.height = 0;
        assert!(matches!(bad.validate(), Err(Error::Projection(_))));

        let mut bad = calib;
        bad.depth.width = 0;
        assert!(matches!(bad.validate(), Err(Error::Projection(_))));

        let mut bad = calib;
        bad.depth.height = 0;
        assert!(matches!(bad.validate(), Err(Error::Projection(_))));
    }
}
