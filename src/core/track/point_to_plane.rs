// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Geometric alignment minimizing point-to-plane distances.
//!
//! For a source vertex `p` transformed into `q = R p + t`
//! and associated to the target vertex `v` with normal `n`,
//! the residual is `r = (q - v) . n`.

use itertools::izip;
use log::trace;

use super::{EstimatorParams, Increment, Levels, PoseEstimator, Rigid};
use crate::core::camera::Intrinsics;
use crate::core::error::Result;
use crate::core::frame::RgbdFrame;
use crate::core::geometry::{self, is_valid_normal, is_valid_vertex};
use crate::core::multires;
use crate::math::accumulator::NormalEquations;
use crate::math::robust::RobustKernel;
use crate::misc::type_aliases::{Float, Mat4d, Vec3Map};

/// Data of one pyramid level.
pub struct Level {
    /// Camera intrinsics at this resolution.
    pub intrinsics: Intrinsics,
    /// Vertices of the source frame.
    pub source_vertices: Vec3Map,
    /// Vertices of the target frame.
    pub target_vertices: Vec3Map,
    /// Unit normals of the target frame.
    pub target_normals: Vec3Map,
}

/// Point-to-plane estimator.
pub struct PointToPlane {
    levels: Levels<Level>,
    depth_diff: f64,
    robust_kernel: RobustKernel,
}

impl PointToPlane {
    /// Build the vertex and normal pyramids from preprocessed frames
    /// (metric depth, NaN for invalid pixels).
    pub fn new(
        source: &RgbdFrame,
        target: &RgbdFrame,
        intrinsics: &Intrinsics,
        params: &EstimatorParams,
    ) -> Self {
        let vertex_pyramid = |frame: &RgbdFrame| -> Vec<Vec3Map> {
            let depths = multires::depth_pyramid(
                params.nb_levels,
                frame.depth().clone(),
                params.pyramid_depth_diff,
                Float::NAN,
            );
            depths
                .iter()
                .zip(intrinsics.multi_res(params.nb_levels))
                .map(|(depth, intrinsics)| geometry::vertex_map(depth, &intrinsics, Float::NAN))
                .collect()
        };
        let levels: Vec<Level> = izip!(
            intrinsics.multi_res(params.nb_levels),
            vertex_pyramid(source),
            vertex_pyramid(target)
        )
        .map(|(intrinsics, source_vertices, target_vertices)| {
            trace!("point to plane level of shape {:?}", source_vertices.shape());
            Level {
                intrinsics,
                target_normals: geometry::normal_map(&target_vertices, Float::NAN),
                source_vertices,
                target_vertices,
            }
        })
        .collect();
        Self {
            levels: super::coarsest_first(levels),
            depth_diff: params.depth_diff,
            robust_kernel: params.robust_kernel,
        }
    }

    /// Data of each level, coarsest first.
    pub fn levels(&self) -> &Levels<Level> {
        &self.levels
    }
}

impl PoseEstimator for PointToPlane {
    fn nb_levels(&self) -> usize {
        self.levels.len()
    }

    fn compute_increment(&self, level: usize, trans: &Mat4d) -> Result<Increment> {
        super::check_level(level, self.levels.len())?;
        let lvl = &self.levels[level];
        let rigid = Rigid::new(trans);
        let shape = lvl.target_vertices.shape();
        let (nb_rows, nb_cols) = lvl.source_vertices.shape();
        let mut system = NormalEquations::new();
        for u in 0..nb_cols {
            for v in 0..nb_rows {
                let p = lvl.source_vertices[(v, u)];
                if !is_valid_vertex(&p) {
                    continue;
                }
                let q = rigid.apply(&p.cast::<f64>());
                let (vt, ut) = match super::project_to_index(&lvl.intrinsics, &q, shape) {
                    Some(index) => index,
                    None => continue,
                };
                let target_vertex = lvl.target_vertices[(vt, ut)];
                let normal = lvl.target_normals[(vt, ut)];
                if !(is_valid_vertex(&target_vertex) && is_valid_normal(&normal)) {
                    continue;
                }
                let normal = normal.cast::<f64>();
                let r = (q - target_vertex.cast::<f64>()).dot(&normal);
                if r.abs() > self.depth_diff {
                    continue;
                }
                let jac = super::left_jacobian(&q, &normal);
                system.add(&jac, r, self.robust_kernel.weight(r));
            }
        }
        super::solve(&system, level)
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::core::error::OdometryError;
    use crate::math::se3;
    use crate::misc::type_aliases::{ColorImage, Image, Vec6d};
    use approx;

    const INTRINSICS: Intrinsics = Intrinsics {
        principal_point: (15.5, 11.5),
        focal: (30.0, 30.0),
        skew: 0.0,
    };

    fn params(nb_levels: usize) -> EstimatorParams {
        EstimatorParams {
            nb_levels,
            depth_diff: 0.07,
            pyramid_depth_diff: 0.14,
            robust_kernel: RobustKernel::L2,
        }
    }

    /// Depth of a bumpy surface, seen from the origin.
    fn bumpy_frame() -> RgbdFrame {
        let depth = Image::from_fn(24, 32, |v, u| {
            let (x, y) = (u as Float / 32.0, v as Float / 24.0);
            1.0 + 0.1 * (6.0 * x).sin() + 0.1 * (5.0 * y).cos() + 0.05 * x * y
        });
        RgbdFrame::new(depth, ColorImage::repeat(24, 32, (0, 0, 0))).unwrap()
    }

    #[test]
    fn levels_are_coarsest_first() {
        let frame = bumpy_frame();
        let estimator = PointToPlane::new(&frame, &frame, &INTRINSICS, &params(3));
        assert_eq!(3, estimator.nb_levels());
        assert_eq!((6, 8), estimator.levels()[0].source_vertices.shape());
        assert_eq!((24, 32), estimator.levels()[2].source_vertices.shape());
        assert_eq!(INTRINSICS, estimator.levels()[2].intrinsics);
        assert_eq!(INTRINSICS.half_res().half_res(), estimator.levels()[0].intrinsics);
    }

    #[test]
    fn identical_frames_give_zero_increment() {
        let frame = bumpy_frame();
        let estimator = PointToPlane::new(&frame, &frame, &INTRINSICS, &params(2));
        let increment = estimator.compute_increment(1, &Mat4d::identity()).unwrap();
        assert!(increment.nb_inliers > 0);
        approx::assert_relative_eq!(0.0, increment.residual, epsilon = 1e-12);
        approx::assert_relative_eq!(Vec6d::zeros(), increment.delta, epsilon = 1e-9);
    }

    #[test]
    fn offset_reduces_residual() {
        let frame = bumpy_frame();
        let estimator = PointToPlane::new(&frame, &frame, &INTRINSICS, &params(1));
        let offset = se3::pose_to_transformation(&Vec6d::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.01));
        let first = estimator.compute_increment(0, &offset).unwrap();
        assert!(first.residual > 0.0);
        let updated = first.transformation() * offset;
        let second = estimator.compute_increment(0, &updated).unwrap();
        assert!(second.residual < first.residual);
    }

    #[test]
    fn invalid_depth_is_degenerate() {
        let depth = Image::repeat(24, 32, Float::NAN);
        let frame = RgbdFrame::new(depth, ColorImage::repeat(24, 32, (0, 0, 0))).unwrap();
        let estimator = PointToPlane::new(&frame, &frame, &INTRINSICS, &params(2));
        let err = estimator.compute_increment(0, &Mat4d::identity()).unwrap_err();
        assert_eq!(
            OdometryError::DegenerateSystem {
                level: 0,
                nb_inliers: 0
            },
            err
        );
    }

    #[test]
    fn level_out_of_range() {
        let frame = bumpy_frame();
        let estimator = PointToPlane::new(&frame, &frame, &INTRINSICS, &params(2));
        let err = estimator.compute_increment(2, &Mat4d::identity()).unwrap_err();
        assert!(matches!(err, OdometryError::InvalidArgument(_)));
    }
}
