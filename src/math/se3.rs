// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversions between 6-parameter poses and 4x4 rigid transformations.
//!
//! A pose is `[alpha, beta, gamma, tx, ty, tz]`:
//! three rotation angles followed by a translation.
//! The rotation is `Rz(gamma) * Ry(beta) * Rx(alpha)`.

use nalgebra::Rotation3;

use crate::misc::type_aliases::{Mat3d, Mat4d, Vec3d, Vec6d};

/// Parameterization of a rigid body motion increment.
pub type Pose = Vec6d;

/// Retrieve the translation part of the pose parameterization.
pub fn translation(pose: &Pose) -> Vec3d {
    Vec3d::new(pose[3], pose[4], pose[5])
}

/// Convert a 6-parameter pose into a 4x4 rigid transformation.
pub fn pose_to_transformation(pose: &Pose) -> Mat4d {
    let rotation = Rotation3::from_euler_angles(pose[0], pose[1], pose[2]);
    from_parts(rotation.matrix(), &translation(pose))
}

/// Inverse of `pose_to_transformation`.
/// Only meaningful for rotations with `|beta| < pi / 2`.
pub fn transformation_to_pose(trans: &Mat4d) -> Pose {
    let rotation = Rotation3::from_matrix_unchecked(rotation_part(trans));
    let (alpha, beta, gamma) = rotation.euler_angles();
    let t = translation_part(trans);
    Pose::new(alpha, beta, gamma, t.x, t.y, t.z)
}

/// Assemble a 4x4 transformation from a rotation matrix and a translation.
pub fn from_parts(rotation: &Mat3d, translation: &Vec3d) -> Mat4d {
    let mut trans = Mat4d::identity();
    trans.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    trans.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    trans
}

/// Top left 3x3 block of a transformation.
pub fn rotation_part(trans: &Mat4d) -> Mat3d {
    trans.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Last column (without the homogeneous coordinate) of a transformation.
pub fn translation_part(trans: &Mat4d) -> Vec3d {
    trans.fixed_view::<3, 1>(0, 3).into_owned()
}

/// Check that every coefficient is finite.
pub fn is_finite(trans: &Mat4d) -> bool {
    trans.iter().all(|x| x.is_finite())
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx;
    use quickcheck_macros;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn zero_pose_is_identity() {
        assert_eq!(Mat4d::identity(), pose_to_transformation(&Pose::zeros()));
    }

    #[test]
    fn pure_translation() {
        let trans = pose_to_transformation(&Pose::new(0.0, 0.0, 0.0, 0.1, -0.2, 0.3));
        assert_eq!(translation_part(&trans), Vec3d::new(0.1, -0.2, 0.3));
        assert_eq!(rotation_part(&trans), Mat3d::identity());
    }

    #[test]
    fn rotation_order_is_zyx() {
        let (a, b, c) = (0.1, -0.2, 0.3);
        let rx = Rotation3::from_axis_angle(&nalgebra::Vector3::x_axis(), a);
        let ry = Rotation3::from_axis_angle(&nalgebra::Vector3::y_axis(), b);
        let rz = Rotation3::from_axis_angle(&nalgebra::Vector3::z_axis(), c);
        let expected = (rz * ry * rx).into_inner();
        let trans = pose_to_transformation(&Pose::new(a, b, c, 0.0, 0.0, 0.0));
        approx::assert_relative_eq!(rotation_part(&trans), expected, epsilon = EPSILON);
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn transformation_is_rigid(a: i16, b: i16, c: i16, x: i16, y: i16, z: i16) -> bool {
        let pose = gen_pose(a, b, c, x, y, z);
        let trans = pose_to_transformation(&pose);
        let r = rotation_part(&trans);
        let last_row = nalgebra::RowVector4::new(0.0, 0.0, 0.0, 1.0);
        let last_row_ok = trans.row(3).into_owned() == last_row;
        approx::relative_eq!(r * r.transpose(), Mat3d::identity(), epsilon = EPSILON)
            && approx::relative_eq!(r.determinant(), 1.0, epsilon = EPSILON)
            && last_row_ok
    }

    #[quickcheck_macros::quickcheck]
    fn pose_transformation_round_trip(a: i16, b: i16, c: i16, x: i16, y: i16, z: i16) -> bool {
        let pose = gen_pose(a, b, c, x, y, z);
        approx::relative_eq!(
            pose,
            transformation_to_pose(&pose_to_transformation(&pose)),
            epsilon = 1e-6
        )
    }

    // GENERATORS ####################################################

    /// Angles in ]-1, 1[ radians, translations in ]-10, 10[.
    fn gen_pose(a: i16, b: i16, c: i16, x: i16, y: i16, z: i16) -> Pose {
        let angle = |v: i16| f64::from(v) / 32_768.0;
        let dist = |v: i16| 10.0 * f64::from(v) / 32_768.0;
        Pose::new(angle(a), angle(b), angle(c), dist(x), dist(y), dist(z))
    }
}
