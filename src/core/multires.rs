// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Multi-resolution pyramids of depth maps and images.
//!
//! Pyramids built here start with the highest resolution (index 0).
//! Reordering them coarsest first is the job of the odometry.

use nalgebra::{DMatrix, Scalar};

use crate::core::error::{OdometryError, Result};
use crate::core::frame;
use crate::misc::type_aliases::{Float, Image};

/// Recursively generate a pyramid of images where each level
/// is half the previous resolution, computed with the mean of each 2x2 block.
pub fn mean_pyramid(max_levels: usize, mat: Image) -> Vec<Image> {
    limited_sequence(max_levels, mat, |m| m, |m| {
        halve(m, |a, b, c, d| 0.25 * (a + b + c + d))
    })
}

/// Pyramid of depth maps, halved with `pyr_down_depth` rules.
pub fn depth_pyramid(
    max_levels: usize,
    depth: Image,
    diff_threshold: Float,
    invalid_fill: Float,
) -> Vec<Image> {
    limited_sequence(max_levels, depth, |m| m, |m| {
        halve(m, |a, b, c, d| {
            fuse_depth(diff_threshold, invalid_fill, a, b, c, d)
        })
    })
}

/// Halve the resolution of a depth map without bleeding across depth discontinuities.
///
/// Each output pixel aggregates a 2x2 block of input pixels.
/// It is the mean of the valid depths of the block,
/// unless their spread (max - min) exceeds `diff_threshold`
/// or none of them is valid, in which case it is `invalid_fill`.
pub fn pyr_down_depth(depth: &Image, diff_threshold: Float, invalid_fill: Float) -> Result<Image> {
    let (nb_rows, nb_cols) = depth.shape();
    if nb_rows == 0 || nb_cols == 0 {
        return Err(OdometryError::InvalidArgument(format!(
            "expected a non empty depth map, got shape ({}, {})",
            nb_rows, nb_cols
        )));
    }
    halve(depth, |a, b, c, d| {
        fuse_depth(diff_threshold, invalid_fill, a, b, c, d)
    })
    .ok_or_else(|| {
        OdometryError::InvalidArgument(format!(
            "depth map of shape ({}, {}) is too small to be halved",
            nb_rows, nb_cols
        ))
    })
}

/// Fuse the 4 depths of a 2x2 block.
#[allow(clippy::many_single_char_names)]
fn fuse_depth(
    diff_threshold: Float,
    invalid_fill: Float,
    a: Float,
    b: Float,
    c: Float,
    d: Float,
) -> Float {
    let mut nb_valid = 0;
    let mut sum = 0.0;
    let mut min = Float::INFINITY;
    let mut max = Float::NEG_INFINITY;
    for &z in [a, b, c, d].iter().filter(|&&z| frame::is_valid(z)) {
        nb_valid += 1;
        sum += z;
        min = min.min(z);
        max = max.max(z);
    }
    if nb_valid == 0 || max - min > diff_threshold {
        invalid_fill
    } else {
        sum / nb_valid as Float
    }
}

/// Recursively apply a function transforming the image
/// until it's not possible anymore or the max number of iterations is reached.
/// Using iterations = 0 has the same effect than iterations = 1 since it always has
/// at least one matrix (the init matrix).
pub fn limited_sequence<I, F, T, U>(
    iterations: usize,
    mat: DMatrix<T>,
    init: I,
    f: F,
) -> Vec<DMatrix<U>>
where
    I: Fn(DMatrix<T>) -> DMatrix<U>,
    F: Fn(&DMatrix<U>) -> Option<DMatrix<U>>,
    T: Scalar,
    U: Scalar,
{
    let mut iteration = 1;
    let f_limited = |x: &DMatrix<U>| {
        if iteration < iterations {
            iteration += 1;
            f(x)
        } else {
            None
        }
    };
    sequence(mat, init, f_limited)
}

/// Recursively apply a function transforming the image
/// until it's not possible anymore.
pub fn sequence<I, F, T, U>(mat: DMatrix<T>, init: I, mut f: F) -> Vec<DMatrix<U>>
where
    I: Fn(DMatrix<T>) -> DMatrix<U>,
    F: FnMut(&DMatrix<U>) -> Option<DMatrix<U>>,
    T: Scalar,
    U: Scalar,
{
    let mut pyr = vec![init(mat)];
    while let Some(new_mat) = pyr.last().and_then(|m| f(m)) {
        pyr.push(new_mat);
    }
    pyr
}

/// Halve the resolution of a matrix by applying a function to each 2x2 block.
/// If one size of the matrix is < 2 then this function returns None.
/// If one size is odd, its last line/column is dropped.
///
/// The block is of the form:
///   a c
///   b d
pub fn halve<F, T, U>(mat: &DMatrix<T>, f: F) -> Option<DMatrix<U>>
where
    F: Fn(T, T, T, T) -> U,
    T: Scalar + Copy,
    U: Scalar,
{
    let (r, c) = mat.shape();
    let half_r = r / 2;
    let half_c = c / 2;
    if half_r == 0 || half_c == 0 {
        None
    } else {
        let half_mat = DMatrix::<U>::from_fn(half_r, half_c, |i, j| {
            let a = mat[(2 * i, 2 * j)];
            let b = mat[(2 * i + 1, 2 * j)];
            let c = mat[(2 * i, 2 * j + 1)];
            let d = mat[(2 * i + 1, 2 * j + 1)];
            f(a, b, c, d)
        });
        Some(half_mat)
    }
}

// TESTS #############################################################
