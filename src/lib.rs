// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dense multi-scale RGB-D odometry.
//!
//! Estimate the rigid motion between two RGB-D frames (depth and color images)
//! by coarse to fine Gauss-Newton iterations on image pyramids.
//! Three alignment strategies are available:
//! point-to-plane (geometric), intensity (photometric), and hybrid.
//!
//! ```no_run
//! use rgbd_odometry_rs::core::frame::RgbdFrame;
//! use rgbd_odometry_rs::core::odometry::{self, Config};
//! use rgbd_odometry_rs::dataset::tum_rgbd;
//! use rgbd_odometry_rs::misc::type_aliases::{ColorImage, Image, Mat4d};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let raw_depth = Image::repeat(480, 640, 5000.0);
//! let color = ColorImage::repeat(480, 640, (128, 128, 128));
//! let source = RgbdFrame::new(raw_depth.clone(), color.clone())?;
//! let target = RgbdFrame::new(raw_depth, color)?;
//! let config = Config {
//!     depth_scale: tum_rgbd::DEPTH_SCALE,
//!     ..Config::default()
//! };
//! let intrinsics = tum_rgbd::INTRINSICS_FR1.matrix();
//! let result = odometry::multi_scale(&source, &target, &intrinsics, &Mat4d::identity(), &config)?;
//! println!("{}", result.transformation);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod core;
pub mod dataset;
pub mod math;
pub mod misc;
