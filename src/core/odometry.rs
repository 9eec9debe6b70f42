// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Coarse to fine RGB-D odometry.
//!
//! All pyramids are built once per call, then each level,
//! from the coarsest to the finest, runs the number of Gauss-Newton
//! iterations prescribed by the schedule.
//! Every increment is left multiplied onto the running transformation.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use crate::core::camera::Intrinsics;
use crate::core::error::{OdometryError, Result};
use crate::core::frame::{self, RgbdFrame};
use crate::core::track::hybrid::{Hybrid, HybridWeights};
use crate::core::track::intensity::Intensity;
use crate::core::track::point_to_plane::PointToPlane;
use crate::core::track::{EstimatorParams, Levels, Method, PoseEstimator};
use crate::math::robust::RobustKernel;
use crate::math::se3;
use crate::misc::type_aliases::{Float, Mat3d, Mat4d};

/// Parameters of the odometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Raw depth values are divided by this to get meters.
    pub depth_scale: f64,
    /// Depths above this, in meters, are discarded.
    pub depth_max: f64,
    /// Maximum depth discrepancy of a correspondence, in meters.
    pub depth_diff: f64,
    /// Number of iterations per level, coarsest level first.
    /// Its length is the number of pyramid levels.
    pub iterations: Vec<usize>,
    /// Alignment strategy.
    pub method: Method,
    /// Weighting of residuals.
    pub robust_kernel: RobustKernel,
    /// Depth pyramids are built with a discontinuity threshold
    /// of `pyramid_depth_diff_factor * depth_diff`.
    pub pyramid_depth_diff_factor: f64,
    /// Weights of the hybrid method.
    pub hybrid_weights: HybridWeights,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            depth_scale: 1000.0,
            depth_max: 3.0,
            depth_diff: 0.07,
            iterations: vec![10, 5, 3],
            method: Method::Hybrid,
            robust_kernel: RobustKernel::L2,
            pyramid_depth_diff_factor: 2.0,
            hybrid_weights: HybridWeights::default(),
        }
    }
}

impl Config {
    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("depth_scale", self.depth_scale),
            ("depth_max", self.depth_max),
            ("depth_diff", self.depth_diff),
            ("pyramid_depth_diff_factor", self.pyramid_depth_diff_factor),
        ];
        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(invalid(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.iterations.is_empty() {
            return Err(invalid("the iteration schedule is empty".to_string()));
        }
        let HybridWeights { depth, intensity } = self.hybrid_weights;
        if !(depth.is_finite() && intensity.is_finite() && depth >= 0.0 && intensity >= 0.0) {
            return Err(invalid(format!(
                "invalid hybrid weights: {:?}",
                self.hybrid_weights
            )));
        }
        if let Some(k) = self.robust_kernel.scale() {
            if !(k.is_finite() && k > 0.0) {
                return Err(invalid(format!(
                    "robust kernel scale must be positive, got {}",
                    k
                )));
            }
        }
        Ok(())
    }

    /// Number of pyramid levels.
    pub fn nb_levels(&self) -> usize {
        self.iterations.len()
    }

    fn estimator_params(&self) -> EstimatorParams {
        EstimatorParams {
            nb_levels: self.nb_levels(),
            depth_diff: self.depth_diff,
            pyramid_depth_diff: (self.pyramid_depth_diff_factor * self.depth_diff) as Float,
            robust_kernel: self.robust_kernel,
        }
    }
}

/// Result of the odometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Odometry {
    /// Rigid transformation mapping source points into the target frame.
    pub transformation: Mat4d,
    /// Residual of every iteration, per level (coarsest first).
    pub residuals: Levels<Vec<f64>>,
    /// Number of correspondences of every iteration, per level (coarsest first).
    pub inliers: Levels<Vec<usize>>,
}

/// Estimate the rigid transformation aligning `source` onto `target`.
///
/// Depth maps are given in raw units (divided by `config.depth_scale`).
/// `init` is the initial guess of the transformation.
///
/// All inputs are validated before any pyramid is built.
/// The call fails with `DegenerateSystem` as soon as one iteration
/// cannot produce a finite increment.
pub fn multi_scale(
    source: &RgbdFrame,
    target: &RgbdFrame,
    intrinsics: &Mat3d,
    init: &Mat4d,
    config: &Config,
) -> Result<Odometry> {
    config.validate()?;
    let intrinsics = check_inputs(source, target, intrinsics, init, config.nb_levels())?;

    let source = preprocess(source, config)?;
    let target = preprocess(target, config)?;
    let estimator = estimator(&source, &target, &intrinsics, config);
    if estimator.nb_levels() != config.nb_levels() {
        return Err(invalid(format!(
            "expected {} pyramid levels, built {}",
            config.nb_levels(),
            estimator.nb_levels()
        )));
    }

    let mut trans = *init;
    let mut residuals = Vec::with_capacity(config.nb_levels());
    let mut inliers = Vec::with_capacity(config.nb_levels());
    for (level, &nb_iterations) in config.iterations.iter().enumerate() {
        let mut level_residuals = Vec::with_capacity(nb_iterations);
        let mut level_inliers = Vec::with_capacity(nb_iterations);
        for iteration in 0..nb_iterations {
            let increment = estimator
                .compute_increment(level, &trans)
                .map_err(|err| {
                    warn!("{} odometry failed at level {}: {}", config.method, level, err);
                    err
                })?;
            debug!(
                "level {}, iteration {}: residual {:.3e} with {} inliers",
                level, iteration, increment.residual, increment.nb_inliers
            );
            let updated = increment.transformation() * trans;
            if !se3::is_finite(&updated) {
                warn!("non finite transformation at level {}", level);
                return Err(OdometryError::DegenerateSystem {
                    level,
                    nb_inliers: increment.nb_inliers,
                });
            }
            trans = updated;
            level_residuals.push(increment.residual);
            level_inliers.push(increment.nb_inliers);
        }
        residuals.push(level_residuals);
        inliers.push(level_inliers);
    }

    Ok(Odometry {
        transformation: trans,
        residuals,
        inliers,
    })
}

/// Same as `multi_scale` with all parameters given explicitly,
/// only returning the transformation.
#[allow(clippy::too_many_arguments)]
pub fn rgbd_odometry_multi_scale(
    source: &RgbdFrame,
    target: &RgbdFrame,
    intrinsics: &Mat3d,
    init: &Mat4d,
    depth_scale: f64,
    depth_max: f64,
    depth_diff: f64,
    iterations: &[usize],
    method: Method,
) -> Result<Mat4d> {
    let config = Config {
        depth_scale,
        depth_max,
        depth_diff,
        iterations: iterations.to_vec(),
        method,
        ..Config::default()
    };
    multi_scale(source, target, intrinsics, init, &config).map(|odometry| odometry.transformation)
}

/// Convert the raw depth of a frame into meters,
/// invalidating depths outside of `]0, depth_max]`.
pub fn preprocess(frame: &RgbdFrame, config: &Config) -> Result<RgbdFrame> {
    let depth = frame::clip_transform(
        frame.depth(),
        config.depth_scale as Float,
        0.0,
        config.depth_max as Float,
        Float::NAN,
    );
    RgbdFrame::new(depth, frame.color().clone())
}

/// Build the estimator of the configured method.
fn estimator(
    source: &RgbdFrame,
    target: &RgbdFrame,
    intrinsics: &Intrinsics,
    config: &Config,
) -> Box<dyn PoseEstimator> {
    let params = config.estimator_params();
    match config.method {
        Method::PointToPlane => Box::new(PointToPlane::new(source, target, intrinsics, &params)),
        Method::Intensity => Box::new(Intensity::new(source, target, intrinsics, &params)),
        Method::Hybrid => Box::new(Hybrid::new(
            source,
            target,
            intrinsics,
            &params,
            config.hybrid_weights,
        )),
    }
}

/// Validate frames, intrinsics and initial guess against each other.
#[allow(clippy::float_cmp)]
fn check_inputs(
    source: &RgbdFrame,
    target: &RgbdFrame,
    intrinsics: &Mat3d,
    init: &Mat4d,
    nb_levels: usize,
) -> Result<Intrinsics> {
    if source.shape() != target.shape() {
        return Err(invalid(format!(
            "source shape {:?} and target shape {:?} differ",
            source.shape(),
            target.shape()
        )));
    }
    let (nb_rows, nb_cols) = source.shape();
    let coarsest = |size: usize| {
        u32::try_from(nb_levels - 1)
            .ok()
            .and_then(|shift| size.checked_shr(shift))
            .unwrap_or(0)
    };
    if coarsest(nb_rows) == 0 || coarsest(nb_cols) == 0 {
        return Err(invalid(format!(
            "frames of shape {:?} are too small for {} pyramid levels",
            source.shape(),
            nb_levels
        )));
    }
    let intrinsics = Intrinsics::from_matrix(intrinsics)
        .ok_or_else(|| invalid(format!("invalid intrinsics matrix: {}", intrinsics)))?;
    let (fx, fy) = intrinsics.focal;
    if fx == 0.0 || fy == 0.0 {
        return Err(invalid(format!("invalid focal lengths: {:?}", intrinsics.focal)));
    }
    if !se3::is_finite(init) {
        return Err(invalid("the initial transformation is not finite".to_string()));
    }
    Ok(intrinsics)
}

fn invalid(msg: String) -> OdometryError {
    OdometryError::InvalidArgument(msg)
}

// TESTS #############################################################
