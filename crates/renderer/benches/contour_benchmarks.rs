//! Benchmarks for contour tracing and overlay rasterization.
//!
//! Run with: cargo bench --package renderer --bench contour_benchmarks

use std::sync::Arc;

use contour_common::{ContourTracer, LevelStyle, Segment, SegmentSink};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use renderer::contour::{connect_segments, march_squares, MarchingSquaresTracer};
use renderer::CanvasSink;
use test_utils::{gaussian_peak, random_starfield};

// =============================================================================
// MARCHING SQUARES BENCHMARKS
// =============================================================================

fn bench_march_squares(c: &mut Criterion) {
    let mut group = c.benchmark_group("march_squares");

    for size in [256usize, 512, 1024] {
        let data = random_starfield(size, size, size / 4, 42);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("starfield", size), &data, |b, data| {
            b.iter(|| march_squares(black_box(data), size, size, black_box(60.0)));
        });
    }

    group.finish();
}

fn bench_connect_segments(c: &mut Criterion) {
    let mut group = c.benchmark_group("connect_segments");

    for size in [256usize, 512] {
        let data = random_starfield(size, size, size / 4, 42);
        let segments = march_squares(&data, size, size, 60.0);
        group.throughput(Throughput::Elements(segments.len() as u64));
        group.bench_with_input(BenchmarkId::new("starfield", size), &segments, |b, segments| {
            b.iter(|| connect_segments(black_box(segments)));
        });
    }

    group.finish();
}

// =============================================================================
// TRACER BENCHMARKS
// =============================================================================

fn bench_tracer_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracer_levels");
    let size = 512;
    let grid: Arc<[f32]> = random_starfield(size, size, 128, 7).into();

    for levels in [1usize, 5, 20] {
        group.bench_with_input(BenchmarkId::new("levels", levels), &levels, |b, &levels| {
            let mut tracer = MarchingSquaresTracer::new();
            tracer.set_grid(Arc::clone(&grid), size, size);
            b.iter(|| {
                for i in 0..levels {
                    tracer.set_level(20.0 + i as f32 * 40.0);
                    black_box(tracer.contours().ok());
                }
            });
        });
    }

    group.finish();
}

// =============================================================================
// CANVAS BENCHMARKS
// =============================================================================

fn bench_canvas_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("canvas_render");
    let size = 512;
    let mut tracer = MarchingSquaresTracer::new();
    tracer.set_grid(gaussian_peak(size, size, 100.0, 60.0).into(), size, size);

    let mut sink = CanvasSink::new(1.0);
    for level in 0..10 {
        tracer.set_level(5.0 + level as f32 * 9.0);
        let style = Arc::new(LevelStyle::default());
        if let Ok(polyline) = tracer.contours() {
            let mut chain = 0u32;
            let mut previous = None;
            for entry in &polyline {
                match (previous, entry) {
                    (Some(a), Some(b)) => sink.add_segment(level, Segment::new(a, *b, chain), &style),
                    (_, None) => chain += 1,
                    _ => {}
                }
                previous = *entry;
            }
        }
    }

    group.bench_function("render_512", |b| {
        b.iter(|| sink.render(black_box(512), black_box(512)).ok());
    });
    group.bench_function("render_png_512", |b| {
        b.iter(|| sink.render_png(black_box(512), black_box(512)).ok());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_march_squares,
    bench_connect_segments,
    bench_tracer_levels,
    bench_canvas_render,
);
criterion_main!(benches);
