//! Tests for the canvas segment sink.

use std::sync::Arc;

use contour_common::{LevelStyle, Point, Rgba, Segment, SegmentSink};
use renderer::CanvasSink;

fn horizontal(y: f64, chain: u32) -> Segment {
    Segment::new(Point::new(2.0, y), Point::new(18.0, y), chain)
}

fn pixel(rgba: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
}

#[test]
fn test_visible_level_is_stroked_in_its_color() {
    let style = Arc::new(LevelStyle::new(Rgba::opaque(255, 0, 0), true));
    let mut sink = CanvasSink::new(3.0);
    sink.add_segment(0, horizontal(10.0, 0), &style);

    let rgba = sink.render(20, 20).unwrap();
    let [r, g, b, a] = pixel(&rgba, 20, 10, 10);
    assert_eq!(a, 255);
    assert_eq!((r, g, b), (255, 0, 0));
    assert_eq!(pixel(&rgba, 20, 10, 2), [0, 0, 0, 0]);
}

#[test]
fn test_style_changes_apply_without_new_segments() {
    let style = Arc::new(LevelStyle::new(Rgba::opaque(255, 0, 0), true));
    let mut sink = CanvasSink::new(3.0);
    sink.add_segment(0, horizontal(10.0, 0), &style);

    style.set_color(Rgba::opaque(0, 0, 255));
    let rgba = sink.render(20, 20).unwrap();
    assert_eq!(pixel(&rgba, 20, 10, 10), [0, 0, 255, 255]);

    style.set_visible(false);
    let rgba = sink.render(20, 20).unwrap();
    assert!(rgba.iter().all(|&b| b == 0));
}

#[test]
fn test_remove_all_segments_clears_level() {
    let style = Arc::new(LevelStyle::default());
    let mut sink = CanvasSink::default();
    sink.add_segment(1, horizontal(5.0, 0), &style);
    sink.add_segment(1, horizontal(6.0, 1), &style);
    assert_eq!(sink.segment_count(), 2);

    sink.remove_all_segments(1);
    assert_eq!(sink.segment_count(), 0);
    assert!(sink.render(20, 20).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn test_repaint_requests_are_counted() {
    let mut sink = CanvasSink::default();
    sink.request_repaint();
    sink.request_repaint();
    assert_eq!(sink.repaint_count(), 2);
}

#[test]
fn test_png_output_has_signature() {
    let style = Arc::new(LevelStyle::default());
    let mut sink = CanvasSink::default();
    sink.add_segment(0, horizontal(4.0, 0), &style);

    let png = sink.render_png(20, 20).unwrap();
    assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
}
