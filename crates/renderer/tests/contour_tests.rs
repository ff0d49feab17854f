//! Tests for the marching squares contour tracer.

use std::sync::Arc;

use contour_common::{sub_loops, ContourTracer, Point, TraceError};
use renderer::contour::{connect_segments, march_squares, MarchingSquaresTracer};
use test_utils::{blank_region, centered_star, gaussian_peak, ramp_grid, starfield, Star};

fn trace(data: Vec<f32>, width: usize, height: usize, level: f32) -> Vec<Option<Point>> {
    let mut tracer = MarchingSquaresTracer::new();
    tracer.set_grid(data.into(), width, height);
    tracer.set_level(level);
    tracer.contours().unwrap()
}

// ============================================================================
// march_squares tests
// ============================================================================

#[test]
fn test_ramp_crosses_every_row_once() {
    let data = ramp_grid(10, 6);
    let segments = march_squares(&data, 10, 6, 4.5);

    assert_eq!(segments.len(), 5);
    for seg in &segments {
        assert!((seg.start.x - 4.5).abs() < 1e-9);
        assert!((seg.end.x - 4.5).abs() < 1e-9);
    }
}

#[test]
fn test_level_outside_range_yields_nothing() {
    let data = gaussian_peak(20, 20, 10.0, 3.0);
    assert!(march_squares(&data, 20, 20, 50.0).is_empty());
    assert!(march_squares(&data, 20, 20, -1.0).is_empty());
}

#[test]
fn test_mismatched_grid_is_empty() {
    assert!(march_squares(&[1.0, 2.0, 3.0], 2, 2, 1.5).is_empty());
}

#[test]
fn test_nan_cells_are_skipped() {
    let mut data = ramp_grid(10, 10);
    blank_region(&mut data, 10, 0, 4, 10, 2);

    let segments = march_squares(&data, 10, 10, 4.5);
    // Rows 3..6 touch a blank sample
    assert_eq!(segments.len(), 6);
    for seg in &segments {
        assert!(seg.start.y <= 3.0 || seg.start.y >= 6.0);
    }
}

// ============================================================================
// connect_segments tests
// ============================================================================

#[test]
fn test_ramp_connects_into_one_open_chain() {
    let data = ramp_grid(10, 6);
    let chains = connect_segments(&march_squares(&data, 10, 6, 4.5));

    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].len(), 6);
}

#[test]
fn test_gaussian_closes_into_loop() {
    let data = gaussian_peak(40, 40, 100.0, 6.0);
    let chains = connect_segments(&march_squares(&data, 40, 40, 50.0));

    assert_eq!(chains.len(), 1);
    let chain = &chains[0];
    let (first, last) = (chain[0], chain[chain.len() - 1]);
    assert!(first.distance(&last) < 1e-6);
}

// ============================================================================
// MarchingSquaresTracer tests
// ============================================================================

#[test]
fn test_two_stars_separated_by_sentinel() {
    let stars = [Star::new(10.0, 10.0, 100.0, 2.0), Star::new(30.0, 30.0, 100.0, 2.0)];
    let polyline = trace(starfield(40, 40, 0.0, &stars), 40, 40, 50.0);

    assert_eq!(polyline.iter().filter(|p| p.is_none()).count(), 1);
    assert!(polyline.first().unwrap().is_some());
    assert!(polyline.last().unwrap().is_some());
    assert_eq!(sub_loops(&polyline).len(), 2);
}

#[test]
fn test_points_lie_on_the_isophote() {
    let star = centered_star(60, 60, 100.0, 8.0);
    let radius = star.radius_at(25.0).unwrap();
    let polyline = trace(gaussian_peak(60, 60, 100.0, 8.0), 60, 60, 25.0);

    for p in polyline.iter().flatten() {
        let r = ((p.x - star.x).powi(2) + (p.y - star.y).powi(2)).sqrt();
        assert!((r - radius).abs() < 0.15, "radius {} vs {}", r, radius);
    }
}

#[test]
fn test_same_grid_many_levels() {
    let mut tracer = MarchingSquaresTracer::new();
    tracer.set_grid(Arc::from(gaussian_peak(40, 40, 100.0, 6.0)), 40, 40);

    let mut previous = usize::MAX;
    for level in [10.0, 50.0, 90.0] {
        tracer.set_level(level);
        let points = tracer.contours().unwrap().len();
        assert!(points > 0);
        assert!(points <= previous);
        previous = points;
    }
}

#[test]
fn test_point_cap_reports_out_of_memory() {
    let mut tracer = MarchingSquaresTracer::with_max_points(4);
    tracer.set_grid(Arc::from(gaussian_peak(40, 40, 100.0, 6.0)), 40, 40);
    tracer.set_level(50.0);

    assert!(matches!(tracer.contours(), Err(TraceError::OutOfMemory { .. })));
}

#[test]
fn test_grid_length_mismatch() {
    let mut tracer = MarchingSquaresTracer::new();
    tracer.set_grid(Arc::from(vec![0.0f32; 5]), 2, 2);

    assert!(matches!(tracer.contours(), Err(TraceError::InvalidGrid(_))));
}
