//! Contour line (isoline) tracing using the marching squares algorithm.
//!
//! The tracer works in working-grid coordinates: the sample at column `x`,
//! row `y` sits at `Point { x, y }`. Crossings are linearly interpolated
//! along cell edges, cell segments are joined into polylines, and the
//! polylines of one level are emitted back to back with a `None` sentinel
//! between them.

use std::collections::HashMap;
use std::sync::Arc;

use contour_common::{ContourTracer, Point, Polyline, TraceError};
use rayon::prelude::*;

/// Default cap on the number of points a single level may produce.
pub const DEFAULT_MAX_POINTS: usize = 4_000_000;

/// Grid quantization used to match segment endpoints.
const ENDPOINT_QUANTUM: f64 = 1e4;

/// A line segment inside one marching squares cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSegment {
    pub start: Point,
    pub end: Point,
}

/// Marching squares contour tracer.
///
/// Holds the grid installed by [`ContourTracer::set_grid`] and traces it at
/// whatever level was last selected.
#[derive(Debug, Clone)]
pub struct MarchingSquaresTracer {
    grid: Option<(Arc<[f32]>, usize, usize)>,
    level: f32,
    max_points: usize,
}

impl MarchingSquaresTracer {
    pub fn new() -> Self {
        Self::with_max_points(DEFAULT_MAX_POINTS)
    }

    /// Tracer refusing levels that would produce more than `max_points`.
    pub fn with_max_points(max_points: usize) -> Self {
        Self {
            grid: None,
            level: 0.0,
            max_points,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }
}

impl Default for MarchingSquaresTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContourTracer for MarchingSquaresTracer {
    fn set_grid(&mut self, data: Arc<[f32]>, width: usize, height: usize) {
        self.grid = Some((data, width, height));
    }

    fn set_level(&mut self, level: f32) {
        self.level = level;
    }

    fn contours(&mut self) -> Result<Polyline, TraceError> {
        let (data, width, height) = self.grid.as_ref().ok_or(TraceError::NoGrid)?;
        if data.len() != width * height {
            return Err(TraceError::InvalidGrid(format!(
                "{} samples for a {}x{} grid",
                data.len(),
                width,
                height
            )));
        }

        let segments = march_squares(data, *width, *height, self.level);
        let chains = connect_segments(&segments);

        let requested = chains.iter().map(|c| c.len() + 1).sum::<usize>();
        if requested > self.max_points {
            return Err(TraceError::OutOfMemory { requested });
        }

        let mut polyline: Polyline = Vec::new();
        polyline
            .try_reserve_exact(requested)
            .map_err(|_| TraceError::OutOfMemory { requested })?;

        for (i, chain) in chains.into_iter().enumerate() {
            if i > 0 {
                polyline.push(None);
            }
            polyline.extend(chain.into_iter().map(Some));
        }

        tracing::trace!(
            level = self.level,
            segments = segments.len(),
            points = polyline.len(),
            "Traced level"
        );

        Ok(polyline)
    }
}

/// Marching squares algorithm to generate contour segments
///
/// # Arguments
/// * `data` - Grid data in row-major order
/// * `width` - Grid width
/// * `height` - Grid height
/// * `level` - Contour level to extract
///
/// # Returns
/// Unordered cell segments, rows in order
pub fn march_squares(data: &[f32], width: usize, height: usize, level: f32) -> Vec<CellSegment> {
    if width < 2 || height < 2 || data.len() != width * height {
        return vec![];
    }

    (0..height - 1)
        .into_par_iter()
        .flat_map_iter(|y| {
            let mut row = Vec::new();
            for x in 0..(width - 1) {
                let tl = data[y * width + x];
                let tr = data[y * width + x + 1];
                let bl = data[(y + 1) * width + x];
                let br = data[(y + 1) * width + x + 1];

                // Blank pixels break the contour
                if tl.is_nan() || tr.is_nan() || bl.is_nan() || br.is_nan() {
                    continue;
                }

                let mut cell_index = 0u8;
                if tl >= level { cell_index |= 1; }
                if tr >= level { cell_index |= 2; }
                if br >= level { cell_index |= 4; }
                if bl >= level { cell_index |= 8; }

                cell_segments(&mut row, cell_index, x as f64, y as f64, [tl, tr, br, bl], level);
            }
            row
        })
        .collect()
}

/// Push the segments of one cell, interpolating the edge crossings.
fn cell_segments(
    out: &mut Vec<CellSegment>,
    cell_index: u8,
    x: f64,
    y: f64,
    corners: [f32; 4],
    level: f32,
) {
    let [tl, tr, br, bl] = corners;

    let top = || interpolate_edge(x, y, x + 1.0, y, tl, tr, level);
    let right = || interpolate_edge(x + 1.0, y, x + 1.0, y + 1.0, tr, br, level);
    let bottom = || interpolate_edge(x, y + 1.0, x + 1.0, y + 1.0, bl, br, level);
    let left = || interpolate_edge(x, y, x, y + 1.0, tl, bl, level);

    let mut push = |start: Point, end: Point| out.push(CellSegment { start, end });

    match cell_index {
        0 | 15 => {}
        1 | 14 => push(left(), top()),
        2 | 13 => push(top(), right()),
        3 | 12 => push(left(), right()),
        4 | 11 => push(right(), bottom()),
        5 => {
            // Saddle: keep the two high corners apart
            push(left(), top());
            push(right(), bottom());
        }
        6 | 9 => push(top(), bottom()),
        7 | 8 => push(left(), bottom()),
        10 => {
            push(top(), right());
            push(left(), bottom());
        }
        _ => {}
    }
}

/// Linearly interpolate between two edge points based on data values
fn interpolate_edge(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    val1: f32,
    val2: f32,
    level: f32,
) -> Point {
    let (val1, val2, level) = (val1 as f64, val2 as f64, level as f64);
    if (val2 - val1).abs() < 1e-12 {
        return Point::new((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    }

    let t = ((level - val1) / (val2 - val1)).clamp(0.0, 1.0);

    Point::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1))
}

fn endpoint_key(p: &Point) -> (i64, i64) {
    (
        (p.x * ENDPOINT_QUANTUM).round() as i64,
        (p.y * ENDPOINT_QUANTUM).round() as i64,
    )
}

/// Connect cell segments into continuous polylines.
///
/// Every segment is used exactly once. A closed loop ends with a copy of its
/// first point.
pub fn connect_segments(segments: &[CellSegment]) -> Vec<Vec<Point>> {
    let mut by_endpoint: HashMap<(i64, i64), Vec<usize>> = HashMap::with_capacity(segments.len() * 2);
    for (i, seg) in segments.iter().enumerate() {
        by_endpoint.entry(endpoint_key(&seg.start)).or_default().push(i);
        by_endpoint.entry(endpoint_key(&seg.end)).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut chains = Vec::new();

    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let seg = segments[first];

        let mut forward = vec![seg.start, seg.end];
        extend_chain(&mut forward, seg.end, segments, &by_endpoint, &mut used);

        let closed = forward.len() > 2
            && endpoint_key(&forward[0]) == endpoint_key(&forward[forward.len() - 1]);
        if closed {
            chains.push(forward);
            continue;
        }

        let mut backward = vec![seg.start];
        extend_chain(&mut backward, seg.start, segments, &by_endpoint, &mut used);

        if backward.len() > 1 {
            backward.reverse();
            backward.pop();
            backward.extend(forward);
            chains.push(backward);
        } else {
            chains.push(forward);
        }
    }

    chains
}

fn extend_chain(
    points: &mut Vec<Point>,
    mut tail: Point,
    segments: &[CellSegment],
    by_endpoint: &HashMap<(i64, i64), Vec<usize>>,
    used: &mut [bool],
) {
    loop {
        let tail_key = endpoint_key(&tail);
        let next = by_endpoint
            .get(&tail_key)
            .and_then(|candidates| candidates.iter().copied().find(|&i| !used[i]));

        let Some(i) = next else { break };
        used[i] = true;

        let seg = &segments[i];
        tail = if endpoint_key(&seg.start) == tail_key {
            seg.end
        } else {
            seg.start
        };
        points.push(tail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_edge() {
        let p = interpolate_edge(0.0, 0.0, 1.0, 0.0, 0.0, 10.0, 5.0);
        assert!((p.x - 0.5).abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
    }

    #[test]
    fn test_march_squares_flat() {
        let data = vec![5.0; 9];
        assert!(march_squares(&data, 3, 3, 5.0).is_empty());
    }

    #[test]
    fn test_peak_closes_into_one_loop() {
        let data = vec![
            0.0, 0.0, 0.0,
            0.0, 10.0, 0.0,
            0.0, 0.0, 0.0,
        ];
        let chains = connect_segments(&march_squares(&data, 3, 3, 5.0));
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 5);
        assert_eq!(endpoint_key(&chains[0][0]), endpoint_key(&chains[0][4]));
    }

    #[test]
    fn test_tracer_without_grid() {
        let mut tracer = MarchingSquaresTracer::new();
        assert_eq!(tracer.contours(), Err(TraceError::NoGrid));
    }
}
