// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{env, error::Error, fs, path::Path, path::PathBuf};

use rgbd_odometry_rs::core::camera::Intrinsics;
use rgbd_odometry_rs::core::frame::RgbdFrame;
use rgbd_odometry_rs::core::odometry::{self, Config};
use rgbd_odometry_rs::dataset::tum_rgbd;
use rgbd_odometry_rs::misc::interop;
use rgbd_odometry_rs::misc::type_aliases::Mat4d;

fn main() {
    let args: Vec<String> = env::args().collect();
    if let Err(error) = my_run(&args) {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

const USAGE: &str = "Usage: ./rgbd_odometry [fr1|fr2|fr3|icl] associations_file [config.json]";

fn my_run(args: &[String]) -> Result<(), Box<dyn Error>> {
    // Check that the arguments are correct.
    let valid_args = check_args(args)?;

    // Build a vector containing timestamps and full paths of images.
    let associations = parse_associations(&valid_args.associations_file_path)?;
    let first = associations.first().ok_or("The association file is empty")?;

    // Print the trajectory of the camera, starting at the origin.
    let mut pose = Mat4d::identity();
    let mut previous = read_frame(first)?;
    println!("{}", tum_rgbd::Frame::from_transformation(first.depth_timestamp, &pose));
    for assoc in associations.iter().skip(1) {
        let current = read_frame(assoc)?;
        // Motion mapping points of the previous camera into the current one.
        match odometry::multi_scale(
            &previous,
            &current,
            &valid_args.intrinsics.matrix(),
            &Mat4d::identity(),
            &valid_args.config,
        ) {
            Ok(result) => match result.transformation.try_inverse() {
                Some(inverse) => pose *= inverse,
                None => eprintln!("Non invertible motion at {}", assoc.depth_timestamp),
            },
            Err(err) => eprintln!("Odometry failed at {}: {}", assoc.depth_timestamp, err),
        }
        println!("{}", tum_rgbd::Frame::from_transformation(assoc.depth_timestamp, &pose));
        previous = current;
    }

    Ok(())
}

struct Args {
    associations_file_path: PathBuf,
    intrinsics: Intrinsics,
    config: Config,
}

/// Verify that command line arguments are correct.
fn check_args(args: &[String]) -> Result<Args, String> {
    let (camera_id, associations_file_path_str, config) = match args {
        [_, camera_id, assoc] => (camera_id, assoc, default_config()),
        [_, camera_id, assoc, config_path] => (camera_id, assoc, read_config(config_path)?),
        _ => {
            eprintln!("{}", USAGE);
            return Err("Wrong number of arguments".to_string());
        }
    };
    let intrinsics = create_camera(camera_id)?;
    let associations_file_path = PathBuf::from(associations_file_path_str);
    if associations_file_path.is_file() {
        Ok(Args {
            associations_file_path,
            intrinsics,
            config,
        })
    } else {
        eprintln!("{}", USAGE);
        Err(format!(
            "The association file does not exist or is not reachable: {}",
            associations_file_path_str
        ))
    }
}

/// Depth images of the TUM RGB-D dataset are scaled by 5000.
fn default_config() -> Config {
    Config {
        depth_scale: tum_rgbd::DEPTH_SCALE,
        ..Config::default()
    }
}

/// Read a json configuration, missing fields take default values.
fn read_config(file_path: &str) -> Result<Config, String> {
    let content = fs::read_to_string(file_path).map_err(|e| format!("{}: {}", file_path, e))?;
    let config: Config =
        serde_json::from_str(&content).map_err(|e| format!("{}: {}", file_path, e))?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Create camera depending on `camera_id` command line argument.
fn create_camera(camera_id: &str) -> Result<Intrinsics, String> {
    match camera_id {
        "fr1" => Ok(tum_rgbd::INTRINSICS_FR1),
        "fr2" => Ok(tum_rgbd::INTRINSICS_FR2),
        "fr3" => Ok(tum_rgbd::INTRINSICS_FR3),
        "icl" => Ok(tum_rgbd::INTRINSICS_ICL_NUIM),
        _ => {
            eprintln!("{}", USAGE);
            Err(format!("Unknown camera id: {}", camera_id))
        }
    }
}

/// Open an association file and parse it into a vector of Association,
/// with images paths relative to the association file.
fn parse_associations(file_path: &Path) -> Result<Vec<tum_rgbd::Association>, Box<dyn Error>> {
    let content = fs::read_to_string(file_path)?;
    let parent = file_path.parent().unwrap_or_else(|| Path::new(""));
    let associations = tum_rgbd::parse::associations(&content)?;
    Ok(associations
        .into_iter()
        .map(|assoc| tum_rgbd::Association {
            depth_file_path: parent.join(&assoc.depth_file_path),
            color_file_path: parent.join(&assoc.color_file_path),
            ..assoc
        })
        .collect())
}

/// Read a depth and color image given by an association.
fn read_frame(assoc: &tum_rgbd::Association) -> Result<RgbdFrame, Box<dyn Error>> {
    let depth = interop::depth_from_luma16(&image::open(&assoc.depth_file_path)?.into_luma16());
    let color = interop::color_from_rgb(&image::open(&assoc.color_file_path)?.into_rgb8());
    Ok(RgbdFrame::new(depth, color)?)
}
