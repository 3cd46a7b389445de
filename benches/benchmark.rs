use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};
use std::time::Duration;
use visual_baseline::{codec, compare, CompareOptions};

// Fast settings for all benchmarks
fn configure_fast_group(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(20);
}

fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

fn benchmark_compare_equal(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");
    configure_fast_group(&mut group);

    let a = gradient_image(256, 256);
    let b = a.clone();
    let options = CompareOptions::new(0.0);

    group.bench_function("equal_256", |bench| {
        bench.iter(|| {
            let result = compare::compare(black_box(&a), black_box(&b), &options);
            black_box(result);
        });
    });

    group.finish();
}

fn benchmark_compare_divergent(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");
    configure_fast_group(&mut group);

    let a = gradient_image(256, 256);
    let mut b = a.clone();
    for y in 100..140 {
        for x in 100..140 {
            b.put_pixel(x, y, Rgba([255, 0, 255, 255]));
        }
    }
    let options = CompareOptions::new(0.0);

    group.bench_function("divergent_256", |bench| {
        bench.iter(|| {
            let result = compare::compare(black_box(&a), black_box(&b), &options);
            black_box(result);
        });
    });

    group.finish();
}

fn benchmark_render_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_diff");
    configure_fast_group(&mut group);

    let a = gradient_image(256, 256);
    let b = gradient_image(256, 256);
    let options = CompareOptions::new(0.0);

    group.bench_function("render_256", |bench| {
        bench.iter(|| {
            let diff = compare::render_diff(black_box(&a), black_box(&b), &options);
            black_box(diff);
        });
    });

    group.finish();
}

fn benchmark_encode_png(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    configure_fast_group(&mut group);

    let image = gradient_image(256, 256);

    group.bench_function("encode_256", |bench| {
        bench.iter(|| {
            let bytes = codec::encode_png(black_box(&image)).unwrap();
            black_box(bytes);
        });
    });

    group.finish();
}

fn benchmark_optimize_png(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    configure_fast_group(&mut group);

    let raw = codec::encode_png(&gradient_image(256, 256)).unwrap();

    group.bench_function("optimize_256", |bench| {
        bench.iter(|| {
            let bytes = codec::optimize_png(black_box(&raw));
            black_box(bytes);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_compare_equal,
    benchmark_compare_divergent,
    benchmark_render_diff,
    benchmark_encode_png,
    benchmark_optimize_png
);
criterion_main!(benches);
