//! Traits for the collaborators the engine drives.

use std::sync::Arc;

use crate::error::TraceError;
use crate::geometry::{Polyline, Segment};
use crate::style::LevelStyle;

/// Boundary tracer for a single threshold over a pixel grid.
///
/// The grid is set once and the tracer is then asked for contours at any
/// number of levels against it.
pub trait ContourTracer: Send {
    /// Install the grid (row-major, `width * height` intensities).
    fn set_grid(&mut self, data: Arc<[f32]>, width: usize, height: usize);

    /// Select the threshold for the next [`ContourTracer::contours`] call.
    fn set_level(&mut self, level: f32);

    /// Trace the current level. Sub-loops are separated by `None`.
    fn contours(&mut self) -> Result<Polyline, TraceError>;
}

/// Display-side store of drawable segments, indexed by level.
pub trait SegmentSink: Send {
    fn add_segment(&mut self, level: usize, segment: Segment, style: &Arc<LevelStyle>);

    fn remove_all_segments(&mut self, level: usize);

    fn request_repaint(&mut self);
}

impl<T: SegmentSink + ?Sized> SegmentSink for Box<T> {
    fn add_segment(&mut self, level: usize, segment: Segment, style: &Arc<LevelStyle>) {
        (**self).add_segment(level, segment, style)
    }

    fn remove_all_segments(&mut self, level: usize) {
        (**self).remove_all_segments(level)
    }

    fn request_repaint(&mut self) {
        (**self).request_repaint()
    }
}
