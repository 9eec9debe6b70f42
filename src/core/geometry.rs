// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per pixel 3D geometry: vertex maps and normal maps.

use crate::core::camera::Intrinsics;
use crate::core::frame;
use crate::misc::type_aliases::{Float, Image, Vec3, Vec3Map};

/// Back project every valid depth pixel into a 3D point in the camera frame.
///
/// Invalid depths give a vertex with all three coordinates set to `invalid_fill`.
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
pub fn vertex_map(depth: &Image, intrinsics: &Intrinsics, invalid_fill: Float) -> Vec3Map {
    let (nb_rows, nb_cols) = depth.shape();
    Vec3Map::from_fn(nb_rows, nb_cols, |v, u| {
        let z = depth[(v, u)];
        if frame::is_valid(z) {
            let point = intrinsics.back_project((u as f64, v as f64), f64::from(z));
            point.map(|x| x as Float)
        } else {
            Vec3::repeat(invalid_fill)
        }
    })
}

/// Estimate unit surface normals from a vertex map.
///
/// The normal at a pixel is the normalized cross product of the vectors
/// going to its right and bottom neighbours.
/// Pixels on the last row or column, or next to an invalid vertex,
/// get a normal with all three coordinates set to `invalid_fill`.
pub fn normal_map(vertices: &Vec3Map, invalid_fill: Float) -> Vec3Map {
    let (nb_rows, nb_cols) = vertices.shape();
    let invalid = Vec3::repeat(invalid_fill);
    Vec3Map::from_fn(nb_rows, nb_cols, |v, u| {
        if v + 1 >= nb_rows || u + 1 >= nb_cols {
            return invalid;
        }
        let center = vertices[(v, u)];
        let right = vertices[(v, u + 1)];
        let bottom = vertices[(v + 1, u)];
        if !(is_valid_vertex(&center) && is_valid_vertex(&right) && is_valid_vertex(&bottom)) {
            return invalid;
        }
        (right - center)
            .cross(&(bottom - center))
            .try_normalize(Float::EPSILON)
            .unwrap_or(invalid)
    })
}

/// A vertex is valid if it is finite and in front of the camera.
#[inline]
pub fn is_valid_vertex(vertex: &Vec3) -> bool {
    vertex.iter().all(|x| x.is_finite()) && vertex.z > 0.0
}

/// A normal is valid if it is finite and non zero.
#[inline]
pub fn is_valid_normal(normal: &Vec3) -> bool {
    normal.iter().all(|x| x.is_finite()) && normal.norm_squared() > 0.0
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx;

    const INTRINSICS: Intrinsics = Intrinsics {
        principal_point: (2.0, 1.5),
        focal: (4.0, 4.0),
        skew: 0.0,
    };

    #[test]
    fn vertices_are_back_projected_pixels() {
        let depth = Image::repeat(4, 5, 2.0);
        let vertices = vertex_map(&depth, &INTRINSICS, Float::NAN);
        assert_eq!((4, 5), vertices.shape());
        // Column 2 is the principal column, row 1 is half a pixel above the principal row.
        approx::assert_relative_eq!(Vec3::new(0.0, -0.25, 2.0), vertices[(1, 2)]);
        approx::assert_relative_eq!(Vec3::new(0.0, 0.25, 2.0), vertices[(2, 2)]);
        approx::assert_relative_eq!(Vec3::new(-1.0, -0.75, 2.0), vertices[(0, 0)]);
    }

    #[test]
    fn invalid_depth_gives_invalid_vertex() {
        let mut depth = Image::repeat(4, 5, 2.0);
        depth[(3, 4)] = Float::NAN;
        depth[(0, 1)] = 0.0;
        let vertices = vertex_map(&depth, &INTRINSICS, Float::NAN);
        assert!(vertices[(3, 4)].iter().all(|x| x.is_nan()));
        assert!(!is_valid_vertex(&vertices[(0, 1)]));
        assert!(is_valid_vertex(&vertices[(2, 2)]));
    }

    #[test]
    fn fronto_parallel_plane_normals() {
        let vertices = vertex_map(&Image::repeat(4, 5, 1.0), &INTRINSICS, Float::NAN);
        let normals = normal_map(&vertices, Float::NAN);
        for v in 0..3 {
            for u in 0..4 {
                approx::assert_relative_eq!(Vec3::new(0.0, 0.0, 1.0), normals[(v, u)]);
            }
        }
        assert!(!is_valid_normal(&normals[(3, 0)]));
        assert!(!is_valid_normal(&normals[(0, 4)]));
    }

    #[test]
    fn normals_are_unit_length() {
        // Slanted plane z = 1 + 0.1 x.
        let depth = Image::from_fn(6, 6, |_, u| 1.0 / (1.0 - 0.1 * (u as Float - 2.0) / 4.0));
        let normals = normal_map(&vertex_map(&depth, &INTRINSICS, Float::NAN), Float::NAN);
        let n = normals[(2, 2)];
        approx::assert_relative_eq!(1.0, n.norm(), epsilon = 1e-5);
        approx::assert_relative_eq!(
            Vec3::new(-0.1, 0.0, 1.0).normalize(),
            n,
            epsilon = 1e-4
        );
    }

    #[test]
    fn invalid_neighbour_invalidates_normal() {
        let mut depth = Image::repeat(4, 5, 1.0);
        depth[(1, 2)] = Float::NAN;
        let normals = normal_map(&vertex_map(&depth, &INTRINSICS, Float::NAN), Float::NAN);
        assert!(!is_valid_normal(&normals[(1, 2)]));
        assert!(!is_valid_normal(&normals[(1, 1)]));
        assert!(!is_valid_normal(&normals[(0, 2)]));
        assert!(is_valid_normal(&normals[(2, 2)]));
    }
}
