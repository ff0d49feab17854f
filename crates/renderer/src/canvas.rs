//! In-memory segment store with tiny-skia rasterization.
//!
//! `CanvasSink` is the display side of the engine: it receives the segments of
//! every level, keeps them until they are removed, and on demand strokes the
//! visible ones onto an RGBA pixmap in each level's current color.

use std::sync::Arc;

use contour_common::{LevelStyle, Segment, SegmentSink};
use thiserror::Error;
use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Errors from rasterizing or encoding the overlay.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid canvas size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Segments and styles for one level.
#[derive(Debug, Default)]
struct LevelSegments {
    segments: Vec<Segment>,
    style: Option<Arc<LevelStyle>>,
}

/// Segment sink that can rasterize itself.
#[derive(Debug)]
pub struct CanvasSink {
    levels: Vec<LevelSegments>,
    line_width: f32,
    repaints: u64,
}

impl CanvasSink {
    pub fn new(line_width: f32) -> Self {
        Self {
            levels: Vec::new(),
            line_width,
            repaints: 0,
        }
    }

    /// Segments currently held for `level`.
    pub fn segments(&self, level: usize) -> &[Segment] {
        self.levels
            .get(level)
            .map(|l| l.segments.as_slice())
            .unwrap_or(&[])
    }

    pub fn segment_count(&self) -> usize {
        self.levels.iter().map(|l| l.segments.len()).sum()
    }

    /// Number of repaint requests received so far.
    pub fn repaint_count(&self) -> u64 {
        self.repaints
    }

    /// Stroke every visible level onto a transparent RGBA canvas.
    ///
    /// Returns premultiplied RGBA bytes, `width * height * 4` long.
    pub fn render(&self, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        Ok(self.render_pixmap(width, height)?.data().to_vec())
    }

    /// Render and encode as PNG.
    pub fn render_png(&self, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        self.render_pixmap(width, height)?
            .encode_png()
            .map_err(|e| RenderError::Encode(e.to_string()))
    }

    fn render_pixmap(&self, width: u32, height: u32) -> Result<Pixmap, RenderError> {
        let mut pixmap =
            Pixmap::new(width, height).ok_or(RenderError::InvalidSize { width, height })?;

        let stroke = Stroke {
            width: self.line_width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        let mut drawn = 0usize;
        for level in &self.levels {
            let Some(style) = level.style.as_ref() else { continue };
            if !style.is_visible() || level.segments.is_empty() {
                continue;
            }

            let color = style.color();
            let mut paint = Paint::default();
            paint.set_color_rgba8(color.r, color.g, color.b, color.a);
            paint.anti_alias = true;

            let mut pb = PathBuilder::new();
            let mut previous: Option<&Segment> = None;
            for seg in &level.segments {
                let continues = previous.is_some_and(|p| p.chain == seg.chain && p.end == seg.start);
                if !continues {
                    pb.move_to(seg.start.x as f32, seg.start.y as f32);
                }
                pb.line_to(seg.end.x as f32, seg.end.y as f32);
                previous = Some(seg);
            }

            if let Some(path) = pb.finish() {
                pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                drawn += level.segments.len();
            }
        }

        tracing::debug!(width, height, segments = drawn, "Rendered contour overlay");

        Ok(pixmap)
    }
}

impl Default for CanvasSink {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SegmentSink for CanvasSink {
    fn add_segment(&mut self, level: usize, segment: Segment, style: &Arc<LevelStyle>) {
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, LevelSegments::default);
        }
        let entry = &mut self.levels[level];
        entry.segments.push(segment);
        if entry.style.as_ref().map_or(true, |s| !Arc::ptr_eq(s, style)) {
            entry.style = Some(Arc::clone(style));
        }
    }

    fn remove_all_segments(&mut self, level: usize) {
        if let Some(entry) = self.levels.get_mut(level) {
            entry.segments.clear();
            entry.style = None;
        }
    }

    fn request_repaint(&mut self) {
        self.repaints += 1;
    }
}
