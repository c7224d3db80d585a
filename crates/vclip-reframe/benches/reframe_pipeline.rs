//! Reframe Pipeline Benchmarks
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --package vclip-reframe --bench reframe_pipeline
//! ```
//!
//! # Metrics Measured
//! - Planning cost per frame (tracking, speaker classification, mode, crop)
//! - Compositing cost per frame by output mode and source resolution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgb, RgbImage};
use std::time::Duration;
use vclip_reframe::{
    BoundingBox, Detection, Frame, MouthLandmarks, Point, ReframeConfig, ReframePipeline,
};

/// Synthetic frame with some variation to simulate real video.
fn create_test_frame(width: u32, height: u32) -> Frame {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 7 + y * 11) % 256) as u8,
            ((x * 13 + y * 17) % 256) as u8,
            ((x * 19 + y * 23) % 256) as u8,
        ])
    });
    Frame::new(0, image)
}

/// Two faces, both talking, scaled to the frame.
fn two_speakers(width: u32, height: u32, step: u64) -> Vec<Detection> {
    let size = height as f64 * 0.25;
    let gap = if step % 2 == 0 { 0.04 } else { 0.1 } * size;
    [0.2, 0.65]
        .iter()
        .map(|fx| {
            let x = width as f64 * fx;
            let y = height as f64 * 0.3;
            let mouth_x = x + size / 2.0;
            let mouth_y = y + size * 0.75;
            Detection::new(BoundingBox::new(x, y, size, size), 0.9).with_mouth(
                MouthLandmarks::new(
                    Point::new(mouth_x, mouth_y - gap / 2.0),
                    Point::new(mouth_x, mouth_y + gap / 2.0),
                ),
            )
        })
        .collect()
}

/// Benchmark tracking, classification, mode selection and crop planning.
fn bench_plan_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_frame");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for interval in [1u32, 2, 4] {
        let config = ReframeConfig {
            detection_interval: interval,
            ..Default::default()
        };
        let mut pipeline = ReframePipeline::new(&config, 1920, 1080, 1080, 1920)
            .expect("valid pipeline config");
        let mut index = 0u64;

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("interval", interval),
            &interval,
            |b, &interval| {
                b.iter(|| {
                    let detections = (index % interval as u64 == 0)
                        .then(|| two_speakers(1920, 1080, index / interval as u64));
                    let result = pipeline.plan_frame(index, black_box(detections.as_deref()));
                    index += 1;
                    black_box(result)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark full per-frame processing including compositing.
fn bench_process_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_frame");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(20);

    let resolutions = [(1920, 1080), (1280, 720), (640, 360)];

    for (width, height) in resolutions {
        let frame = create_test_frame(width, height);
        let config = ReframeConfig {
            detection_interval: 1,
            ..Default::default()
        };
        let mut pipeline = ReframePipeline::new(&config, width, height, 1080, 1920)
            .expect("valid pipeline config");
        let mut step = 0u64;

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("two_speakers", format!("{}x{}", width, height)),
            &frame,
            |b, frame| {
                b.iter(|| {
                    let detections = two_speakers(width, height, step);
                    step += 1;
                    let result = pipeline.process_frame(black_box(frame), Some(&detections));
                    black_box(result)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_plan_frame, bench_process_frame);
criterion_main!(benches);
