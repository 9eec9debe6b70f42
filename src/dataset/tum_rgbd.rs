// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions to handle datasets compatible with TUM RGB-D.

use nalgebra as na;
use std::fmt;
use std::path::PathBuf;

use crate::core::camera::Intrinsics;
use crate::math::se3;
use crate::misc::type_aliases::{Iso3d, Mat4d};

/// U16 depth values are scaled for better precision.
/// So 5000 in the 16 bits gray png corresponds to 1 meter.
pub const DEPTH_SCALE: f64 = 5000.0;

/// Intrinsics parameters of the ICL-NUIM dataset.
pub const INTRINSICS_ICL_NUIM: Intrinsics = Intrinsics {
    principal_point: (319.5, 239.5),
    focal: (481.20, -480.00),
    skew: 0.0,
};

/// Intrinsics parameters of freiburg 1 (fr1) scenes in the TUM RGB-D dataset.
#[allow(clippy::excessive_precision)]
pub const INTRINSICS_FR1: Intrinsics = Intrinsics {
    principal_point: (318.643_040, 255.313_989),
    focal: (517.306_408, 516.469_215),
    skew: 0.0,
};

/// Intrinsics parameters of freiburg 2 (fr2) scenes in the TUM RGB-D dataset.
#[allow(clippy::excessive_precision)]
pub const INTRINSICS_FR2: Intrinsics = Intrinsics {
    principal_point: (325.141_442, 249.701_764),
    focal: (520.908_620, 521.007_327),
    skew: 0.0,
};

/// Intrinsics parameters of freiburg 3 (fr3) scenes in the TUM RGB-D dataset.
#[allow(clippy::excessive_precision)]
pub const INTRINSICS_FR3: Intrinsics = Intrinsics {
    principal_point: (320.106_653, 247.632_132),
    focal: (535.433_105, 539.212_524),
    skew: 0.0,
};

/// Timestamp and 3D camera pose of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Timestamp of the frame.
    pub timestamp: f64,
    /// Pose (rigid body motion / direct isometry) of the frame.
    pub pose: Iso3d,
}

impl Frame {
    /// Frame whose pose is given by a 4x4 rigid transformation.
    pub fn from_transformation(timestamp: f64, trans: &Mat4d) -> Self {
        let rotation = na::Rotation3::from_matrix_unchecked(se3::rotation_part(trans));
        let translation = na::Translation3::from(se3::translation_part(trans));
        let rotation = na::UnitQuaternion::from_rotation_matrix(&rotation);
        Self {
            timestamp,
            pose: Iso3d::from_parts(translation, rotation),
        }
    }
}

/// Association of two related depth and color timestamps and images file paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    /// Timestamp of the depth image.
    pub depth_timestamp: f64,
    /// File path of the depth image.
    pub depth_file_path: PathBuf,
    /// Timestamp of the color image.
    pub color_timestamp: f64,
    /// File path of the color image.
    pub color_file_path: PathBuf,
}

/// Write Frame data in the TUM RGB-D format for trajectories:
/// `timestamp tx ty tz qx qy qz qw`.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let t = self.pose.translation.vector;
        let q = self.pose.rotation.into_inner().coords;
        write!(
            f,
            "{} {} {} {} {} {} {} {}",
            self.timestamp, t.x, t.y, t.z, q.x, q.y, q.z, q.w
        )
    }
}

/// Parse association files of datasets using the TUM RGB-D format.
pub mod parse {
    use super::*;
    use nom::{
        branch::alt,
        bytes::complete::{is_not, tag},
        character::complete::space1,
        combinator::{map, rest},
        number::complete::double,
        sequence::{preceded, tuple},
        IResult,
    };

    /// Parse an association file into a vector of `Association`.
    pub fn associations(file_content: &str) -> Result<Vec<Association>, String> {
        multi_line(association_line, file_content)
    }

    fn multi_line<F, T>(line_parser: F, file_content: &str) -> Result<Vec<T>, String>
    where
        F: Fn(&str) -> IResult<&str, Option<T>>,
    {
        let mut vec_data = Vec::new();
        for (line_number, line) in file_content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line_parser(line) {
                Ok((_, Some(data))) => vec_data.push(data),
                Ok(_) => (),
                Err(_) => return Err(format!("Parsing error at line {}", line_number + 1)),
            }
        }
        Ok(vec_data)
    }

    // nom parsers #############################################################

    // Associations --------------------

    // Association line is either a comment or two timestamps and file paths.
    fn association_line(input: &str) -> IResult<&str, Option<Association>> {
        alt((map(comment, |_| None), map(association, Some)))(input)
    }

    // Parse an association of depth and color timestamps and file paths.
    fn association(input: &str) -> IResult<&str, Association> {
        map(
            tuple((
                double,
                preceded(space1, path),
                preceded(space1, double),
                preceded(space1, path),
            )),
            |(depth_timestamp, depth_file_path, color_timestamp, color_file_path)| Association {
                depth_timestamp,
                depth_file_path,
                color_timestamp,
                color_file_path,
            },
        )(input)
    }

    fn path(input: &str) -> IResult<&str, PathBuf> {
        map(is_not(" \t\r\n"), PathBuf::from)(input)
    }

    // Parse a comment.
    fn comment(input: &str) -> IResult<&str, ()> {
        map(preceded(tag("#"), rest), |_| ())(input)
    }
} // pub mod parse

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx;
    use std::f64::consts::PI;

    const ASSOCIATIONS: &str = "\
# depth timestamp, depth file, color timestamp, color file
1305031102.160407 depth/1305031102.160407.png 1305031102.175304 rgb/1305031102.175304.png

1305031102.194330 depth/1305031102.194330.png 1305031102.211214 rgb/1305031102.211214.png
";

    #[test]
    fn parse_associations() {
        let associations = parse::associations(ASSOCIATIONS).unwrap();
        assert_eq!(2, associations.len());
        let second = &associations[1];
        assert_eq!(1305031102.194330, second.depth_timestamp);
        assert_eq!(PathBuf::from("depth/1305031102.194330.png"), second.depth_file_path);
        assert_eq!(1305031102.211214, second.color_timestamp);
        assert_eq!(PathBuf::from("rgb/1305031102.211214.png"), second.color_file_path);
    }

    #[test]
    fn parse_errors_report_line() {
        let err = parse::associations("# comment\nnot an association").unwrap_err();
        assert!(err.contains("line 2"));
    }

    #[test]
    fn frame_keeps_transformation() {
        let trans = se3::pose_to_transformation(&se3::Pose::new(0.1, -0.2, 0.3, 1.0, 2.0, -0.5));
        let frame = Frame::from_transformation(1.5, &trans);
        approx::assert_relative_eq!(trans, frame.pose.to_homogeneous(), epsilon = 1e-9);
    }

    #[test]
    fn frame_is_written_in_tum_format() {
        // Half turn around z.
        let trans = se3::pose_to_transformation(&se3::Pose::new(0.0, 0.0, PI, 1.0, 2.0, -0.5));
        let line = Frame::from_transformation(1.5, &trans).to_string();
        let values: Vec<f64> = line.split(' ').map(|x| x.parse().unwrap()).collect();
        assert_eq!(8, values.len());
        assert_eq!(1.5, values[0]);
        approx::assert_relative_eq!(1.0, values[1], epsilon = 1e-12);
        approx::assert_relative_eq!(2.0, values[2], epsilon = 1e-12);
        approx::assert_relative_eq!(-0.5, values[3], epsilon = 1e-12);
        // Quaternion (qx, qy, qz, qw), up to its sign.
        let q = nalgebra::Vector4::new(values[4], values[5], values[6], values[7]);
        approx::assert_relative_eq!(1.0, q.z.abs(), epsilon = 1e-9);
        approx::assert_relative_eq!(0.0, q.x.abs() + q.y.abs() + q.w.abs(), epsilon = 1e-9);
    }
}
