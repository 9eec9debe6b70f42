// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Photometric alignment minimizing intensity differences.
//!
//! For a source pixel `x` with vertex `p`, transformed into `q = R p + t`
//! and projected onto the target pixel `y`,
//! the residual is `r = I_target(y) - I_source(x)`.
//! Correspondences whose target depth disagrees with `q.z` are rejected.

use itertools::izip;
use log::trace;

use super::{EstimatorParams, Increment, Levels, PoseEstimator, Rigid};
use crate::core::camera::Intrinsics;
use crate::core::error::Result;
use crate::core::frame::{self, RgbdFrame};
use crate::core::geometry;
use crate::core::gradient::{self, SOBEL_SCALE};
use crate::core::multires;
use crate::math::accumulator::NormalEquations;
use crate::math::robust::RobustKernel;
use crate::misc::type_aliases::{Float, Image, Mat4d, Vec3Map, Vec3d, Vec6d};

/// Photometric data of one pyramid level.
pub struct Level {
    /// Camera intrinsics at this resolution.
    pub intrinsics: Intrinsics,
    /// Metric depth of the source frame.
    pub source_depth: Image,
    /// Vertices of the source frame.
    pub source_vertices: Vec3Map,
    /// Gray intensity of the source frame.
    pub source_intensity: Image,
    /// Metric depth of the target frame.
    pub target_depth: Image,
    /// Gray intensity of the target frame.
    pub target_intensity: Image,
    /// Horizontal derivative of the target intensity, per pixel.
    pub target_intensity_dx: Image,
    /// Vertical derivative of the target intensity, per pixel.
    pub target_intensity_dy: Image,
}

/// A photometric correspondence that passed every check.
pub(super) struct Correspondence {
    /// Transformed source vertex.
    pub point: Vec3d,
    /// Pixel `(row, col)` in the target images.
    pub target: (usize, usize),
    /// Intensity residual.
    pub residual: f64,
    /// Jacobian of the intensity residual.
    pub jacobian: Vec6d,
}

impl Level {
    /// Associate the source pixel `(v, u)` with a target pixel
    /// and compute its intensity residual and jacobian.
    pub(super) fn correspondence(
        &self,
        rigid: &Rigid,
        (v, u): (usize, usize),
        depth_diff: f64,
    ) -> Option<Correspondence> {
        if !frame::is_valid(self.source_depth[(v, u)]) {
            return None;
        }
        let p = self.source_vertices[(v, u)];
        if !geometry::is_valid_vertex(&p) {
            return None;
        }
        let q = rigid.apply(&p.cast::<f64>());
        let (vt, ut) = super::project_to_index(&self.intrinsics, &q, self.target_depth.shape())?;
        let target_depth = self.target_depth[(vt, ut)];
        if !frame::is_valid(target_depth) || (f64::from(target_depth) - q.z).abs() > depth_diff {
            return None;
        }
        let gradient = super::projection_gradient(
            &self.intrinsics,
            &q,
            (
                f64::from(self.target_intensity_dx[(vt, ut)]),
                f64::from(self.target_intensity_dy[(vt, ut)]),
            ),
        );
        let residual =
            f64::from(self.target_intensity[(vt, ut)]) - f64::from(self.source_intensity[(v, u)]);
        Some(Correspondence {
            point: q,
            target: (vt, ut),
            residual,
            jacobian: super::left_jacobian(&q, &gradient),
        })
    }
}

/// Build the photometric levels, finest first.
pub(super) fn build_levels(
    source: &RgbdFrame,
    target: &RgbdFrame,
    intrinsics: &Intrinsics,
    params: &EstimatorParams,
) -> Vec<Level> {
    let n = params.nb_levels;
    let depths = |f: &RgbdFrame| {
        multires::depth_pyramid(n, f.depth().clone(), params.pyramid_depth_diff, Float::NAN)
    };
    let intensities = |f: &RgbdFrame| multires::mean_pyramid(n, frame::intensity(f.color()));
    izip!(
        intrinsics.multi_res(n),
        depths(source),
        intensities(source),
        depths(target),
        intensities(target)
    )
    .map(
        |(intrinsics, source_depth, source_intensity, target_depth, target_intensity)| {
            trace!("photometric level of shape {:?}", source_depth.shape());
            let (dx, dy) = gradient::sobel(&target_intensity);
            Level {
                source_vertices: geometry::vertex_map(&source_depth, &intrinsics, Float::NAN),
                intrinsics,
                source_depth,
                source_intensity,
                target_depth,
                target_intensity,
                target_intensity_dx: dx * SOBEL_SCALE,
                target_intensity_dy: dy * SOBEL_SCALE,
            }
        },
    )
    .collect()
}

/// Photometric estimator.
pub struct Intensity {
    levels: Levels<Level>,
    depth_diff: f64,
    robust_kernel: RobustKernel,
}

impl Intensity {
    /// Build the depth and intensity pyramids from preprocessed frames.
    pub fn new(
        source: &RgbdFrame,
        target: &RgbdFrame,
        intrinsics: &Intrinsics,
        params: &EstimatorParams,
    ) -> Self {
        Self {
            levels: super::coarsest_first(build_levels(source, target, intrinsics, params)),
            depth_diff: params.depth_diff,
            robust_kernel: params.robust_kernel,
        }
    }

    /// Data of each level, coarsest first.
    pub fn levels(&self) -> &Levels<Level> {
        &self.levels
    }
}

impl PoseEstimator for Intensity {
    fn nb_levels(&self) -> usize {
        self.levels.len()
    }

    fn compute_increment(&self, level: usize, trans: &Mat4d) -> Result<Increment> {
        super::check_level(level, self.levels.len())?;
        let lvl = &self.levels[level];
        let rigid = Rigid::new(trans);
        let (nb_rows, nb_cols) = lvl.source_depth.shape();
        let mut system = NormalEquations::new();
        for u in 0..nb_cols {
            for v in 0..nb_rows {
                if let Some(c) = lvl.correspondence(&rigid, (v, u), self.depth_diff) {
                    system.add(&c.jacobian, c.residual, self.robust_kernel.weight(c.residual));
                }
            }
        }
        super::solve(&system, level)
    }
}

// TESTS #############################################################
