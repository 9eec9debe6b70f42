// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors surfaced by the odometry.

use thiserror::Error;

/// Everything that can go wrong when estimating odometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OdometryError {
    /// Malformed image shape, mismatching frames, or invalid configuration values.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Unknown method or other unsupported setting.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    /// The linear system of a pyramid level could not be solved,
    /// typically because there was no usable correspondence.
    #[error("degenerate system at level {level} ({nb_inliers} inliers)")]
    DegenerateSystem {
        /// Pyramid level (0 is the coarsest).
        level: usize,
        /// Number of correspondences used to build the system.
        nb_inliers: usize,
    },
}

/// Shorthand for results of odometry operations.
pub type Result<T> = std::result::Result<T, OdometryError>;
