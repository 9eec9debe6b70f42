// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Joint photometric and geometric alignment.
//!
//! Each correspondence of the intensity estimator contributes two residuals:
//! the intensity difference `r_I` and the depth difference `r_D = D_target(y) - q.z`.
//! Both rows are scaled by the square root of their weight before accumulation.

use log::trace;
use serde::{Deserialize, Serialize};

use super::intensity::{self, Correspondence};
use super::{EstimatorParams, Increment, Levels, PoseEstimator, Rigid};
use crate::core::camera::Intrinsics;
use crate::core::error::Result;
use crate::core::frame::RgbdFrame;
use crate::core::gradient::{self, SOBEL_SCALE};
use crate::math::accumulator::NormalEquations;
use crate::math::robust::RobustKernel;
use crate::misc::type_aliases::{Image, Mat4d, Vec3d};

/// Relative weights of the depth and intensity residuals.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct HybridWeights {
    /// Weight of the depth residuals.
    pub depth: f64,
    /// Weight of the intensity residuals.
    pub intensity: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            depth: 0.968,
            intensity: 0.032,
        }
    }
}

/// Data of one pyramid level.
pub struct Level {
    /// Depth and intensity data.
    pub photometric: intensity::Level,
    /// Horizontal derivative of the target depth, per pixel.
    pub target_depth_dx: Image,
    /// Vertical derivative of the target depth, per pixel.
    pub target_depth_dy: Image,
}

/// Hybrid estimator.
pub struct Hybrid {
    levels: Levels<Level>,
    depth_diff: f64,
    robust_kernel: RobustKernel,
    sqrt_weights: (f64, f64),
}

impl Hybrid {
    /// Build the depth, intensity and gradient pyramids from preprocessed frames.
    pub fn new(
        source: &RgbdFrame,
        target: &RgbdFrame,
        intrinsics: &Intrinsics,
        params: &EstimatorParams,
        weights: HybridWeights,
    ) -> Self {
        let levels: Vec<Level> = intensity::build_levels(source, target, intrinsics, params)
            .into_iter()
            .map(|photometric| {
                trace!("depth gradients of shape {:?}", photometric.target_depth.shape());
                let (dx, dy) = gradient::sobel(&photometric.target_depth);
                Level {
                    photometric,
                    target_depth_dx: dx * SOBEL_SCALE,
                    target_depth_dy: dy * SOBEL_SCALE,
                }
            })
            .collect();
        Self {
            levels: super::coarsest_first(levels),
            depth_diff: params.depth_diff,
            robust_kernel: params.robust_kernel,
            sqrt_weights: (weights.depth.sqrt(), weights.intensity.sqrt()),
        }
    }

    /// Data of each level, coarsest first.
    pub fn levels(&self) -> &Levels<Level> {
        &self.levels
    }
}

impl PoseEstimator for Hybrid {
    fn nb_levels(&self) -> usize {
        self.levels.len()
    }

    fn compute_increment(&self, level: usize, trans: &Mat4d) -> Result<Increment> {
        super::check_level(level, self.levels.len())?;
        let lvl = &self.levels[level];
        let photo = &lvl.photometric;
        let rigid = Rigid::new(trans);
        let (sqrt_depth, sqrt_intensity) = self.sqrt_weights;
        let (nb_rows, nb_cols) = photo.source_depth.shape();
        let mut system = NormalEquations::new();
        for u in 0..nb_cols {
            for v in 0..nb_rows {
                let Correspondence {
                    point: q,
                    target,
                    residual,
                    jacobian,
                } = match photo.correspondence(&rigid, (v, u), self.depth_diff) {
                    Some(c) => c,
                    None => continue,
                };
                let (ddx, ddy) = (lvl.target_depth_dx[target], lvl.target_depth_dy[target]);
                if ddx.is_nan() || ddy.is_nan() {
                    continue;
                }
                let depth_gradient = super::projection_gradient(
                    &photo.intrinsics,
                    &q,
                    (f64::from(ddx), f64::from(ddy)),
                );
                // q.z itself moves with the pose.
                let jac_depth = super::left_jacobian(&q, &(depth_gradient - Vec3d::z()));
                let r_depth = sqrt_depth * (f64::from(photo.target_depth[target]) - q.z);
                let r_intensity = sqrt_intensity * residual;
                system.add_terms(&[
                    (
                        sqrt_intensity * jacobian,
                        r_intensity,
                        self.robust_kernel.weight(r_intensity),
                    ),
                    (
                        sqrt_depth * jac_depth,
                        r_depth,
                        self.robust_kernel.weight(r_depth),
                    ),
                ]);
            }
        }
        super::solve(&system, level)
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::core::track::intensity::tests::{depth, params, texture, INTRINSICS};
    use crate::core::track::intensity::Intensity;
    use crate::math::se3;
    use crate::misc::type_aliases::{Float, Vec6d};
    use approx;

    #[test]
    fn default_weights() {
        let weights = HybridWeights::default();
        approx::assert_relative_eq!(1.0, weights.depth + weights.intensity);
    }

    #[test]
    fn identical_frames_give_zero_increment() {
        let frame = RgbdFrame::new(depth(), texture(0)).unwrap();
        let weights = HybridWeights::default();
        let estimator = Hybrid::new(&frame, &frame, &INTRINSICS, &params(2), weights);
        let increment = estimator.compute_increment(1, &Mat4d::identity()).unwrap();
        assert_eq!(24 * 32, increment.nb_inliers);
        approx::assert_relative_eq!(0.0, increment.residual, epsilon = 1e-12);
        approx::assert_relative_eq!(Vec6d::zeros(), increment.delta, epsilon = 1e-9);
    }

    #[test]
    fn depth_offset_is_weighted() {
        let source = RgbdFrame::new(depth(), texture(0)).unwrap();
        let target = RgbdFrame::new(depth().add_scalar(0.01), texture(0)).unwrap();
        let weights = HybridWeights::default();
        let estimator = Hybrid::new(&source, &target, &INTRINSICS, &params(1), weights);
        let increment = estimator.compute_increment(0, &Mat4d::identity()).unwrap();
        approx::assert_relative_eq!(weights.depth * 1e-4, increment.residual, epsilon = 1e-8);
    }

    #[test]
    fn depth_offset_is_corrected_along_z() {
        let source = RgbdFrame::new(depth(), texture(0)).unwrap();
        let target = RgbdFrame::new(depth().add_scalar(0.01), texture(0)).unwrap();
        let weights = HybridWeights {
            depth: 1.0,
            intensity: 0.0,
        };
        let estimator = Hybrid::new(&source, &target, &INTRINSICS, &params(1), weights);
        let increment = estimator.compute_increment(0, &Mat4d::identity()).unwrap();
        let translation = se3::translation(&increment.delta);
        assert!(translation.z > 0.0);
        let updated = estimator.compute_increment(0, &increment.transformation()).unwrap();
        assert!(updated.residual < increment.residual);
    }

    #[test]
    fn depth_holes_invalidate_neighbour_gradients() {
        let mut holes = depth();
        holes[(12, 16)] = Float::NAN;
        let frame = RgbdFrame::new(holes, texture(0)).unwrap();
        let hybrid = Hybrid::new(&frame, &frame, &INTRINSICS, &params(1), HybridWeights::default());
        let photometric = Intensity::new(&frame, &frame, &INTRINSICS, &params(1));
        let with_gradients = hybrid.compute_increment(0, &Mat4d::identity()).unwrap();
        let without = photometric.compute_increment(0, &Mat4d::identity()).unwrap();
        assert_eq!(24 * 32 - 1, without.nb_inliers);
        assert_eq!(without.nb_inliers - 8, with_gradients.nb_inliers);
    }
}
