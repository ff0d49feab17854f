//! Tests for pixel/sky conversion and projection identity.

use std::sync::Arc;

use contour_common::Point;
use projection::{is_same_projection, reproject, Projection, ProjectionError, SkyCoord, TangentProjection};

fn orion(crpix: (f64, f64), scale: f64, rotation: f64) -> TangentProjection {
    TangentProjection::from_scale(crpix, SkyCoord::new(83.822, -5.391), scale, rotation).unwrap()
}

#[test]
fn test_roundtrip_across_the_frame() {
    let proj = orion((1024.0, 1024.0), 0.6, 17.0);

    for &(x, y) in &[(0.0, 0.0), (2047.0, 0.0), (1024.5, 1024.5), (300.25, 1900.75)] {
        let sky = proj.pixel_to_sky(Point::new(x, y)).unwrap();
        let back = proj.sky_to_pixel(sky).unwrap();
        assert!((back.x - x).abs() < 1e-6, "x {} -> {}", x, back.x);
        assert!((back.y - y).abs() < 1e-6, "y {} -> {}", y, back.y);
    }
}

#[test]
fn test_pixel_offsets_match_plate_scale() {
    let proj = orion((100.0, 100.0), 2.0, 0.0);
    let a = proj.pixel_to_sky(Point::new(100.0, 100.0)).unwrap();
    let b = proj.pixel_to_sky(Point::new(100.0, 130.0)).unwrap();

    // 30 pixels at 2 arcsec
    assert!((a.separation(&b) * 3600.0 - 60.0).abs() < 1e-3);
}

#[test]
fn test_reproject_between_shifted_frames() {
    let from = orion((50.0, 50.0), 1.0, 0.0);
    let to = orion((80.0, 20.0), 1.0, 0.0);

    let p = reproject(Point::new(12.0, 34.0), &from, &to).unwrap();
    assert!((p.x - 42.0).abs() < 1e-6);
    assert!((p.y - 4.0).abs() < 1e-6);
}

#[test]
fn test_reproject_into_rotated_frame_keeps_distances() {
    let from = orion((50.0, 50.0), 1.0, 0.0);
    let to = orion((50.0, 50.0), 1.0, 90.0);

    let a = reproject(Point::new(50.0, 50.0), &from, &to).unwrap();
    let b = reproject(Point::new(60.0, 50.0), &from, &to).unwrap();
    assert!((a.distance(&b) - 10.0).abs() < 1e-4);
}

#[test]
fn test_far_side_of_sky_is_not_visible() {
    let proj = orion((0.0, 0.0), 1.0, 0.0);
    let antipode = SkyCoord::new(83.822 + 180.0, 5.391);

    assert!(matches!(
        proj.sky_to_pixel(antipode),
        Err(ProjectionError::NotVisible { .. })
    ));
}

#[test]
fn test_identity_check() {
    let a: Arc<dyn Projection> = Arc::new(orion((10.0, 10.0), 1.0, 0.0));
    let b: Arc<dyn Projection> = Arc::new(orion((10.0, 10.0), 1.0, 0.0));
    let c: Arc<dyn Projection> = Arc::new(orion((11.0, 10.0), 1.0, 0.0));

    assert!(is_same_projection(&a, &a));
    assert!(is_same_projection(&a, &b));
    assert!(!is_same_projection(&a, &c));
}
