//! # Lane Detection Benchmark

use criterion::{criterion_group, criterion_main, Criterion};
use image::Rgb;

use comms_if::eqpt::cam::Frame;
use drive_lib::{
    lane_det::{LaneDet, Params},
    stopline::{self, StoplineDet},
};
use util::module::State;

/// A full size frame with a yellow left line, a white right line and a stopline.
fn synthetic_frame() -> Frame {
    Frame::from_fn(640, 480, |x, y| {
        let (x, y) = (x as i32, y as i32);

        if y < 290 || y > 450 {
            Rgb([40, 40, 40])
        } else if (x + y - 470).abs() <= 3 {
            Rgb([230, 200, 20])
        } else if (x - y + 70).abs() <= 3 {
            Rgb([240, 240, 240])
        } else if (400..410).contains(&y) && (150..300).contains(&x) {
            Rgb([255, 255, 255])
        } else {
            Rgb([40, 40, 40])
        }
    })
}

fn lane_det_benchmark(c: &mut Criterion) {
    let frame = synthetic_frame();

    let mut lane_det = LaneDet::new(Params::default());
    c.bench_function("lane_det", |b| b.iter(|| lane_det.proc(&frame).unwrap()));

    let mut stopline = StoplineDet::new(stopline::Params::default());
    c.bench_function("stopline", |b| b.iter(|| stopline.proc(&frame).unwrap()));
}

criterion_group!(benches, lane_det_benchmark);
criterion_main!(benches);
