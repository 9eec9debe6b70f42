// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interoperability conversions between the image and matrix types.
//!
//! Images are row major while matrices are column major,
//! so every conversion reads the buffer in row order.

use image::{ImageBuffer, Luma, Rgb, RgbImage};

use crate::misc::type_aliases::{ColorImage, Float, Image};

/// 16 bits gray image, typically a depth map.
pub type Luma16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Convert an `RgbImage` into a color matrix.
pub fn color_from_rgb(img: &RgbImage) -> ColorImage {
    let (width, height) = img.dimensions();
    let pixels: Vec<(u8, u8, u8)> = img.pixels().map(|&Rgb([r, g, b])| (r, g, b)).collect();
    ColorImage::from_row_slice(height as usize, width as usize, &pixels)
}

/// Convert a 16 bits depth image into a matrix of raw (unscaled) depth values.
pub fn depth_from_luma16(img: &Luma16Image) -> Image {
    let (width, height) = img.dimensions();
    let raw: Vec<Float> = img.as_raw().iter().map(|&d| Float::from(d)).collect();
    Image::from_row_slice(height as usize, width as usize, &raw)
}

// TESTS #############################################################
