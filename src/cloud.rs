// SPDX-License-Identifier: Apache-2.0

//! Colored point cloud container and depth-to-cloud projection.
//!
//! [`PointCloud`] uses a structure-of-arrays (SoA) layout: coordinates and
//! colors live in separate vectors that are always index-aligned, so
//! `point[i]` corresponds to `color[i]` by construction. Points are pushed
//! through a single method to keep the vectors in lockstep.

use crate::{
    calib::Calibration,
    camera::{Error, FramePair},
};
use itertools::izip;

/// Point cloud with per-point RGB color.
///
/// Coordinates are meters in the depth camera frame. All six vectors have
/// equal length at all times; the fields are private and only grow through
/// [`PointCloud::push`].
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
    r: Vec<u8>,
    g: Vec<u8>,
    b: Vec<u8>,
}

impl PointCloud {
    /// Create an empty cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            r: Vec::with_capacity(capacity),
            g: Vec::with_capacity(capacity),
            b: Vec::with_capacity(capacity),
        }
    }

    /// Append a point and its color together.
    pub fn push(&mut self, point: [f32; 3], color: [u8; 3]) {
        self.x.push(point[0]);
        self.y.push(point[1]);
        self.z.push(point[2]);
        self.r.push(color[0]);
        self.g.push(color[1]);
        self.b.push(color[2]);
    }

    /// Clear all points while retaining capacity.
    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.z.clear();
        self.r.clear();
        self.g.clear();
        self.b.clear();
    }

    /// Get the current number of points.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// X coordinates.
    pub fn x(&self) -> &[f32] {
        &self.x
    }

    /// Y coordinates.
    pub fn y(&self) -> &[f32] {
        &self.y
    }

    /// Z coordinates.
    pub fn z(&self) -> &[f32] {
        &self.z
    }

    /// Red channel, index-aligned with the coordinates.
    pub fn r(&self) -> &[u8] {
        &self.r
    }

    /// Green channel.
    pub fn g(&self) -> &[u8] {
        &self.g
    }

    /// Blue channel.
    pub fn b(&self) -> &[u8] {
        &self.b
    }

    /// Collect positions as `[x, y, z]` triples.
    pub fn positions(&self) -> Vec<[f32; 3]> {
        izip!(&self.x, &self.y, &self.z)
            .map(|(&x, &y, &z)| [x, y, z])
            .collect()
    }

    /// Collect colors as `[r, g, b]` triples, index-aligned with
    /// [`Self::positions`].
    pub fn colors(&self) -> Vec<[u8; 3]> {
        izip!(&self.r, &self.g, &self.b)
            .map(|(&r, &g, &b)| [r, g, b])
            .collect()
    }
}

/// Project a depth + color frame pair into a colored point cloud.
///
/// For every depth pixel with a non-zero value:
/// 1. Scale the raw value to meters with the calibration depth scale.
/// 2. Back-project through the depth intrinsics into the depth frame.
/// 3. Transform into the color frame via the depth-to-color extrinsics.
/// 4. Forward-project through the color intrinsics and sample the RGB
///    pixel there, clamping to the image bounds.
///
/// Zero-depth pixels (no return) produce no point. Points landing behind
/// the color camera are skipped.
pub fn project_frame(pair: &FramePair, calib: &Calibration) -> Result<PointCloud, Error> {
    calib.validate()?;

    let (depth_rows, depth_cols) = pair.depth.dim();
    if depth_cols != calib.depth.width as usize || depth_rows != calib.depth.height as usize {
        return Err(Error::Projection(format!(
            "depth grid {}x{} does not match calibration {}x{}",
            depth_cols, depth_rows, calib.depth.width, calib.depth.height
        )));
    }

    let (color_rows, color_cols, channels) = pair.color.dim();
    if channels != 3 {
        return Err(Error::Projection(format!(
            "color grid has {} channels, expected 3",
            channels
        )));
    }
    if color_cols != calib.color.width as usize || color_rows != calib.color.height as usize {
        return Err(Error::Projection(format!(
            "color grid {}x{} does not match calibration {}x{}",
            color_cols, color_rows, calib.color.width, calib.color.height
        )));
    }

    let mut cloud = PointCloud::with_capacity(depth_rows * depth_cols);

    for row in 0..depth_rows {
        for col in 0..depth_cols {
            let raw = pair.depth[[row, col]];
            if raw == 0 {
                continue;
            }

            let depth_m = raw as f32 * calib.depth_scale;
            let point = calib.depth.deproject(col as f32, row as f32, depth_m);
            let in_color = calib.depth_to_color.transform(point);

            let Some((u, v)) = calib.color.project(in_color) else {
                continue;
            };

            // Clamp texture coordinates at the image edge rather than
            // dropping the point.
            let ci = (u.round() as isize).clamp(0, color_cols as isize - 1) as usize;
            let ri = (v.round() as isize).clamp(0, color_rows as isize - 1) as usize;

            cloud.push(
                point,
                [
                    pair.color[[ri, ci, 0]],
                    pair.color[[ri, ci, 1]],
                    pair.color[[ri, ci, 2]],
                ],
            );
        }
    }

    Ok(cloud)
}
