// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pose estimators computing one Gauss-Newton increment per call.
//!
//! Each estimator owns the multi-resolution data it needs,
//! stored coarsest level first (index 0) and finest level last.
//! All of them use projective data association:
//! a source point is transformed by the current estimate,
//! projected in the target image and matched with the nearest pixel.
//!
//! Jacobians are computed for a left perturbation `exp(delta) * trans`
//! with `delta = [alpha, beta, gamma, tx, ty, tz]` (rotation first),
//! which is the parameterization of `math::se3::pose_to_transformation`.

pub mod hybrid;
pub mod intensity;
pub mod point_to_plane;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::core::camera::Intrinsics;
use crate::core::error::{OdometryError, Result};
use crate::math::accumulator::NormalEquations;
use crate::math::robust::RobustKernel;
use crate::math::se3::{self, Pose};
use crate::misc::type_aliases::{Float, Mat3d, Mat4d, Vec3d, Vec6d};

/// Type alias to easily spot vectors that are indexed over multi-resolution levels.
/// Index 0 is the coarsest level.
pub type Levels<T> = Vec<T>;

/// Alignment strategy.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Geometric point-to-plane distances.
    PointToPlane,
    /// Photometric intensity differences.
    Intensity,
    /// Weighted combination of depth and intensity differences.
    Hybrid,
}

impl FromStr for Method {
    type Err = OdometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "point_to_plane" => Ok(Method::PointToPlane),
            "intensity" => Ok(Method::Intensity),
            "hybrid" => Ok(Method::Hybrid),
            _ => Err(OdometryError::UnsupportedConfiguration(format!(
                "unknown odometry method: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Method::PointToPlane => "point_to_plane",
            Method::Intensity => "intensity",
            Method::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

/// Result of one Gauss-Newton iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct Increment {
    /// Pose increment, to be left multiplied onto the current transformation.
    pub delta: Pose,
    /// Mean squared residual of the correspondences, evaluated before the update.
    pub residual: f64,
    /// Number of correspondences used.
    pub nb_inliers: usize,
}

impl Increment {
    /// 4x4 rigid transformation of the increment.
    pub fn transformation(&self) -> Mat4d {
        se3::pose_to_transformation(&self.delta)
    }
}

/// Common interface of the point-to-plane, intensity and hybrid estimators.
pub trait PoseEstimator {
    /// Number of pyramid levels available.
    fn nb_levels(&self) -> usize;

    /// Compute the Gauss-Newton increment at a given level (0 is the coarsest)
    /// for the current source to target transformation.
    ///
    /// Fails with `DegenerateSystem` if the level has no usable correspondence
    /// or if the normal equations cannot be solved.
    fn compute_increment(&self, level: usize, trans: &Mat4d) -> Result<Increment>;
}

/// Settings shared by every estimator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EstimatorParams {
    /// Number of pyramid levels.
    pub nb_levels: usize,
    /// Correspondences with a depth discrepancy above this are rejected.
    pub depth_diff: f64,
    /// Discontinuity threshold used when halving depth maps.
    pub pyramid_depth_diff: Float,
    /// Weighting of residuals.
    pub robust_kernel: RobustKernel,
}

// Helper ######################################################################

/// Rotation and translation parts of a transformation, ready to apply on points.
struct Rigid {
    rotation: Mat3d,
    translation: Vec3d,
}

impl Rigid {
    fn new(trans: &Mat4d) -> Self {
        Self {
            rotation: se3::rotation_part(trans),
            translation: se3::translation_part(trans),
        }
    }

    #[inline]
    fn apply(&self, point: &Vec3d) -> Vec3d {
        self.rotation * point + self.translation
    }
}

/// Project a point and round to the nearest pixel `(row, col)`.
/// Returns `None` for points behind the camera or outside of the image.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
fn project_to_index(
    intrinsics: &Intrinsics,
    point: &Vec3d,
    (nb_rows, nb_cols): (usize, usize),
) -> Option<(usize, usize)> {
    let (u, v) = intrinsics.project_to_pixel(*point)?;
    let (u, v) = (u.round(), v.round());
    if u >= 0.0 && u < nb_cols as f64 && v >= 0.0 && v < nb_rows as f64 {
        Some((v as usize, u as usize))
    } else {
        None
    }
}

/// Jacobian of `g . q` with respect to a left perturbation of the point `q`.
#[inline]
fn left_jacobian(point: &Vec3d, gradient: &Vec3d) -> Vec6d {
    let w = point.cross(gradient);
    Vec6d::new(w.x, w.y, w.z, gradient.x, gradient.y, gradient.z)
}

/// Chain an image gradient `(gx, gy)` (per pixel) with the projection of a point.
///
/// The result is the gradient of the image value with respect to the 3D point.
#[inline]
fn projection_gradient(intrinsics: &Intrinsics, point: &Vec3d, (gx, gy): (f64, f64)) -> Vec3d {
    let (fx, fy) = intrinsics.focal;
    let inv_z = 1.0 / point.z;
    let c0 = gx * fx * inv_z;
    let c1 = (gx * intrinsics.skew + gy * fy) * inv_z;
    let c2 = -(c0 * point.x + c1 * point.y) * inv_z;
    Vec3d::new(c0, c1, c2)
}

/// Solve the normal equations of a level into an increment.
fn solve(system: &NormalEquations, level: usize) -> Result<Increment> {
    let nb_inliers = system.nb_inliers();
    let delta = system
        .solve()
        .ok_or(OdometryError::DegenerateSystem { level, nb_inliers })?;
    Ok(Increment {
        delta,
        residual: system.residual(),
        nb_inliers,
    })
}

/// Reorder a pyramid built from the finest level into a coarsest first one.
fn coarsest_first<T>(mut finest_first: Vec<T>) -> Levels<T> {
    finest_first.reverse();
    finest_first
}

/// Check that a level index exists.
fn check_level(level: usize, nb_levels: usize) -> Result<()> {
    if level < nb_levels {
        Ok(())
    } else {
        Err(OdometryError::InvalidArgument(format!(
            "level {} out of range, only {} levels",
            level, nb_levels
        )))
    }
}

// TESTS #############################################################
