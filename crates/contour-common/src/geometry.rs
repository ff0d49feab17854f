//! Geometry primitives: points, sentinel-separated polylines and segments.

use serde::{Deserialize, Serialize};

/// A point in 2D pixel space.
///
/// Depending on context this is a working-grid coordinate, a native pixel of
/// the source image, or a display pixel of the current view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Traced output for one level.
///
/// Consecutive `Some` entries belong to one sub-loop; a `None` sentinel ends
/// the current sub-loop and the next `Some` starts an independent one.
pub type Polyline = Vec<Option<Point>>;

/// Split a polyline into its sub-loops, dropping sentinels and empty runs.
pub fn sub_loops(polyline: &[Option<Point>]) -> Vec<&[Option<Point>]> {
    polyline
        .split(|p| p.is_none())
        .filter(|run| !run.is_empty())
        .collect()
}

/// A drawable line segment.
///
/// `chain` numbers the sub-loop the segment was built from; consecutive
/// segments with the same `chain` share endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
    pub chain: u32,
}

impl Segment {
    pub fn new(start: Point, end: Point, chain: u32) -> Self {
        Self { start, end, chain }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }
}

/// An integer pixel rectangle in native image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelRect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole image.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as i64, height as i64)
    }

    /// Intersect with `[0, width) x [0, height)`.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn clamp_to(&self, width: usize, height: usize) -> Option<PixelRect> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.x.saturating_add(self.width).min(width as i64);
        let y1 = self.y.saturating_add(self.height).min(height as i64);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(PixelRect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn area(&self) -> usize {
        self.width.max(0).saturating_mul(self.height.max(0)) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_loops_split_on_sentinels() {
        let line: Polyline = vec![
            Some(Point::new(0.0, 0.0)),
            Some(Point::new(1.0, 0.0)),
            None,
            None,
            Some(Point::new(5.0, 5.0)),
        ];
        let loops = sub_loops(&line);
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].len(), 2);
        assert_eq!(loops[1].len(), 1);
    }

    #[test]
    fn test_clamp_partially_outside() {
        let rect = PixelRect::new(-10, 90, 50, 50);
        assert_eq!(rect.clamp_to(100, 100), Some(PixelRect::new(0, 90, 40, 10)));
    }

    #[test]
    fn test_clamp_fully_outside() {
        let rect = PixelRect::new(200, 200, 10, 10);
        assert_eq!(rect.clamp_to(100, 100), None);
    }

    #[test]
    fn test_clamp_extreme_extents() {
        let huge = PixelRect::new(-5, -5, i64::MAX, i64::MAX);
        assert_eq!(huge.clamp_to(100, 50), Some(PixelRect::full(100, 50)));

        let far = PixelRect::new(i64::MAX - 1, i64::MAX - 1, i64::MAX, i64::MAX);
        assert_eq!(far.clamp_to(100, 50), None);
    }
}
