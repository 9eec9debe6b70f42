// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions to compute gradients with 3x3 Sobel filters.
//!
//! Borders are handled by replicating the outermost pixels.
//! Responses are not normalized: multiply by `SOBEL_SCALE` to get a per pixel derivative.
//! Invalid (NaN) pixels propagate into the gradients of their neighbours.

use crate::misc::type_aliases::{Float, Image};

/// Scale turning a Sobel response into a derivative per pixel.
pub const SOBEL_SCALE: Float = 0.125;

/// Horizontal and vertical Sobel responses.
pub fn sobel(img: &Image) -> (Image, Image) {
    (sobel_x(img), sobel_y(img))
}

/// Horizontal Sobel response.
///
/// The 3x3 neighbourhood is of the form:
///   a d g
///   b e h
///   c f i
#[allow(clippy::many_single_char_names)]
pub fn sobel_x(img: &Image) -> Image {
    filter_3x3(img, |[a, b, c, _, _, _, g, h, i]| {
        g + 2.0 * h + i - a - 2.0 * b - c
    })
}

/// Vertical Sobel response.
///
/// The 3x3 neighbourhood is of the form:
///   a d g
///   b e h
///   c f i
#[allow(clippy::many_single_char_names)]
pub fn sobel_y(img: &Image) -> Image {
    filter_3x3(img, |[a, _, c, d, _, f, g, _, i]| {
        c + 2.0 * f + i - a - 2.0 * d - g
    })
}

/// Apply a function on the 3x3 neighbourhood of every pixel,
/// given in column major order.
fn filter_3x3<F>(img: &Image, f: F) -> Image
where
    F: Fn([Float; 9]) -> Float,
{
    let (nb_rows, nb_cols) = img.shape();
    let clamp = |x: usize, dx: isize, size: usize| -> usize {
        let moved = x as isize + dx;
        moved.max(0).min(size as isize - 1) as usize
    };
    Image::from_fn(nb_rows, nb_cols, |i, j| {
        let mut neighbourhood = [0.0; 9];
        let mut index = 0;
        for dj in -1..=1 {
            let jj = clamp(j, dj, nb_cols);
            for di in -1..=1 {
                neighbourhood[index] = img[(clamp(i, di, nb_rows), jj)];
                index += 1;
            }
        }
        f(neighbourhood)
    })
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use quickcheck_macros;

    #[test]
    fn horizontal_ramp() {
        // Each column is 3 more than the previous one.
        let img = Image::from_fn(5, 6, |_, j| 3.0 * j as Float);
        let (gx, gy) = sobel(&img);
        // Inside the image, the derivative is 3 per pixel.
        assert_eq!(3.0, SOBEL_SCALE * gx[(2, 2)]);
        assert_eq!(0.0, gy[(2, 2)]);
        // Replicated borders halve the centered difference.
        assert_eq!(1.5, SOBEL_SCALE * gx[(2, 0)]);
    }

    #[test]
    fn vertical_ramp() {
        let img = Image::from_fn(5, 6, |i, _| -2.0 * i as Float);
        let (gx, gy) = sobel(&img);
        assert_eq!(0.0, gx[(3, 3)]);
        assert_eq!(-2.0, SOBEL_SCALE * gy[(3, 3)]);
    }

    #[test]
    fn nan_propagates_to_neighbours() {
        let mut img = Image::repeat(5, 5, 1.0);
        img[(2, 2)] = Float::NAN;
        let gx = sobel_x(&img);
        assert!(gx[(2, 1)].is_nan());
        assert!(gx[(1, 3)].is_nan());
        assert!(!gx[(0, 0)].is_nan());
    }

    #[test]
    fn single_pixel_image() {
        let (gx, gy) = sobel(&Image::repeat(1, 1, 4.0));
        assert_eq!(0.0, gx[(0, 0)]);
        assert_eq!(0.0, gy[(0, 0)]);
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn constant_image_has_no_gradient(value: u8, rows: u8, cols: u8) -> bool {
        let (rows, cols) = (1 + rows as usize % 16, 1 + cols as usize % 16);
        let img = Image::repeat(rows, cols, Float::from(value));
        let (gx, gy) = sobel(&img);
        gx.iter().chain(gy.iter()).all(|&g| g == 0.0)
    }
}
