// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Type aliases for common types used all over the code base.

use nalgebra as na;

/// Image data (depth, intensity, vertices, normals) is stored in f32.
pub type Float = f32;

/// A vector with three Float coordinates.
pub type Vec3 = na::Vector3<Float>;

/// A vector with three f64 coordinates.
pub type Vec3d = na::Vector3<f64>;
/// A vector with six f64 coordinates.
/// Used for pose increments and jacobians.
pub type Vec6d = na::Vector6<f64>;

/// A 3x3 matrix of f64.
pub type Mat3d = na::Matrix3<f64>;
/// A 4x4 matrix of f64.
/// Rigid transformations are always in double precision.
pub type Mat4d = na::Matrix4<f64>;
/// A 6x6 matrix of f64.
pub type Mat6d = na::Matrix6<f64>;

/// A direct 3D isometry, used for camera poses.
pub type Iso3d = na::Isometry3<f64>;

/// Single channel image.
pub type Image = na::DMatrix<Float>;
/// Three channels map of 3D vectors (vertex map or normal map).
pub type Vec3Map = na::DMatrix<Vec3>;
/// 8 bits RGB color image.
pub type ColorImage = na::DMatrix<(u8, u8, u8)>;
