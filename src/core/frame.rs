// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! RGB-D frames and their preprocessing.

use crate::core::error::{OdometryError, Result};
use crate::misc::type_aliases::{ColorImage, Float, Image};

/// Luma weights of the red, green and blue channels.
const GRAY_WEIGHTS: (Float, Float, Float) = (0.299, 0.587, 0.114);

/// A depth map and a color image with the same resolution.
///
/// Invalid depth pixels are marked with NaN (or any non positive value).
#[derive(Clone, Debug)]
pub struct RgbdFrame {
    depth: Image,
    color: ColorImage,
}

impl RgbdFrame {
    /// Pair a depth map and a color image.
    /// Both must have the same, non empty, shape.
    pub fn new(depth: Image, color: ColorImage) -> Result<Self> {
        if depth.is_empty() {
            return Err(OdometryError::InvalidArgument(
                "empty depth image".to_string(),
            ));
        }
        if depth.shape() != color.shape() {
            return Err(OdometryError::InvalidArgument(format!(
                "depth shape {:?} and color shape {:?} differ",
                depth.shape(),
                color.shape()
            )));
        }
        Ok(Self { depth, color })
    }

    /// Depth map of the frame.
    pub fn depth(&self) -> &Image {
        &self.depth
    }

    /// Color image of the frame.
    pub fn color(&self) -> &ColorImage {
        &self.color
    }

    /// `(nb_rows, nb_cols)` of both images.
    pub fn shape(&self) -> (usize, usize) {
        self.depth.shape()
    }
}

/// A depth value is valid if it is finite and strictly positive.
#[inline]
pub fn is_valid(depth: Float) -> bool {
    depth.is_finite() && depth > 0.0
}

/// Convert raw depth values into metric depth and clip them.
///
/// Each value is divided by `scale` and kept if it is valid
/// and in `]min, max]`, replaced by `fill` otherwise.
pub fn clip_transform(depth: &Image, scale: Float, min: Float, max: Float, fill: Float) -> Image {
    depth.map(|d| {
        let d = d / scale;
        if is_valid(d) && d > min && d <= max {
            d
        } else {
            fill
        }
    })
}

/// Gray intensity in `[0, 1]` of a color image.
pub fn intensity(color: &ColorImage) -> Image {
    let (wr, wg, wb) = GRAY_WEIGHTS;
    color.map(|(r, g, b)| {
        (wr * Float::from(r) + wg * Float::from(g) + wb * Float::from(b)) / 255.0
    })
}

// TESTS #############################################################
