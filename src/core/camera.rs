// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pinhole camera intrinsics.

use serde::{Deserialize, Serialize};

use crate::misc::type_aliases::{Mat3d, Vec3d};

/// Intrinsic parameters of a pinhole camera.
///
/// Kept in double precision, just like rigid transformations.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Intrinsics {
    /// Principal point `(cx, cy)`.
    pub principal_point: (f64, f64),
    /// Focal lengths `(fx, fy)` in pixels.
    pub focal: (f64, f64),
    /// Skew coefficient.
    pub skew: f64,
}

impl Intrinsics {
    /// Build intrinsics from a 3x3 projection matrix.
    ///
    /// The matrix is normalized by its homogeneous entry (bottom right).
    /// Returns `None` if that entry is zero or if any coefficient is not finite.
    pub fn from_matrix(mat: &Mat3d) -> Option<Intrinsics> {
        let w = mat[(2, 2)];
        if w == 0.0 || mat.iter().any(|x| !x.is_finite()) {
            return None;
        }
        Some(Intrinsics {
            principal_point: (mat[(0, 2)] / w, mat[(1, 2)] / w),
            focal: (mat[(0, 0)] / w, mat[(1, 1)] / w),
            skew: mat[(0, 1)] / w,
        })
    }

    /// Equivalent 3x3 projection matrix.
    #[rustfmt::skip]
    pub fn matrix(&self) -> Mat3d {
        let (cx, cy) = self.principal_point;
        let (fx, fy) = self.focal;
        Mat3d::new(
            fx,  self.skew, cx,
            0.0, fy,        cy,
            0.0, 0.0,       1.0,
        )
    }

    /// Intrinsics of every level of a pyramid with `n` levels,
    /// starting with the full resolution.
    /// Each level owns its own copy.
    pub fn multi_res(self, n: usize) -> Vec<Intrinsics> {
        std::iter::successors(Some(self), |level| Some(level.half_res()))
            .take(n)
            .collect()
    }

    /// Intrinsics at half the resolution.
    ///
    /// Focal lengths, principal point and skew are halved,
    /// the homogeneous entry stays at 1.
    pub fn half_res(&self) -> Intrinsics {
        let (cx, cy) = self.principal_point;
        let (fx, fy) = self.focal;
        Intrinsics {
            principal_point: (cx / 2.0, cy / 2.0),
            focal: (fx / 2.0, fy / 2.0),
            skew: self.skew / 2.0,
        }
    }

    /// Project a 3D point into homogeneous image coordinates.
    pub fn project(&self, point: Vec3d) -> Vec3d {
        let (cx, cy) = self.principal_point;
        let (fx, fy) = self.focal;
        Vec3d::new(
            fx * point[0] + self.skew * point[1] + cx * point[2],
            fy * point[1] + cy * point[2],
            point[2],
        )
    }

    /// Project a 3D point into pixel coordinates.
    /// Returns `None` for points with a non positive depth.
    pub fn project_to_pixel(&self, point: Vec3d) -> Option<(f64, f64)> {
        if point[2] > 0.0 {
            let uvz = self.project(point);
            Some((uvz.x / uvz.z, uvz.y / uvz.z))
        } else {
            None
        }
    }

    /// Back project a pixel with a known depth into a 3D point.
    pub fn back_project(&self, (u, v): (f64, f64), depth: f64) -> Vec3d {
        let (cx, cy) = self.principal_point;
        let (fx, fy) = self.focal;
        let z = depth;
        let y = (v - cy) * z / fy;
        let x = ((u - cx) * z - self.skew * y) / fx;
        Vec3d::new(x, y, z)
    }
}

// TESTS #############################################################
