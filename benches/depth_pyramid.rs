// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::{criterion_group, criterion_main, Criterion};
use rgbd_odometry_rs::core::{geometry, multires};
use rgbd_odometry_rs::dataset::tum_rgbd;
use rgbd_odometry_rs::misc::type_aliases::{Float, Image};

fn criterion_benchmark(c: &mut Criterion) {
    let depth = Image::from_fn(480, 640, |v, u| 1.0 + 0.001 * (u + v) as Float);
    c.bench_function("depth_pyramid 3 480x640", |b| {
        b.iter(|| multires::depth_pyramid(3, depth.clone(), 0.14, Float::NAN))
    });
    c.bench_function("mean_pyramid 3 480x640", |b| {
        b.iter(|| multires::mean_pyramid(3, depth.clone()))
    });
    c.bench_function("vertex and normal maps 480x640", |b| {
        b.iter(|| {
            let vertices = geometry::vertex_map(&depth, &tum_rgbd::INTRINSICS_FR1, Float::NAN);
            geometry::normal_map(&vertices, Float::NAN)
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
