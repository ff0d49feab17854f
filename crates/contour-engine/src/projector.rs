//! Mapping traced polylines into display space.

use std::sync::Arc;

use contour_common::{ContourError, Point, Result, Segment};
use projection::{is_same_projection, Projection};

use crate::sampler::WorkingGrid;

/// Converts working-grid points to display pixels for one view.
///
/// Points first go back to the source image's native pixels (undoing the
/// crop, the block factor and the denoise shift). If the view is drawn in a
/// different projection than the source, each point then makes a round trip
/// through the sky.
pub struct ContourProjector<'a> {
    grid: &'a WorkingGrid,
    source: Arc<dyn Projection>,
    view: Arc<dyn Projection>,
    reproject: bool,
}

impl<'a> ContourProjector<'a> {
    pub fn new(grid: &'a WorkingGrid, source: Arc<dyn Projection>, view: Arc<dyn Projection>) -> Self {
        let reproject = !is_same_projection(&source, &view);
        Self {
            grid,
            source,
            view,
            reproject,
        }
    }

    /// Whether points go through the sky on their way to the display.
    pub fn needs_reprojection(&self) -> bool {
        self.reproject
    }

    /// Display position of a working-grid point, or `None` if it has none
    /// (off the view's visible hemisphere).
    pub fn to_display(&self, p: Point) -> Option<Point> {
        let native = self.grid.to_native(p);
        if !self.reproject {
            return Some(native);
        }

        self.source
            .pixel_to_sky(native)
            .and_then(|sky| self.view.sky_to_pixel(sky))
            .ok()
    }

    /// Build the chained segments for one level.
    ///
    /// The first point of a sub-loop opens a chain and every following point
    /// adds a segment from its predecessor. A sentinel, or a point that cannot
    /// be displayed, ends the chain.
    pub fn project(&self, polyline: &[Option<Point>]) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();
        segments
            .try_reserve(polyline.len())
            .map_err(|_| ContourError::resource_exhausted("projecting contours", polyline.len()))?;

        let mut previous: Option<Point> = None;
        let mut chain = 0u32;
        let mut chains = 0u32;
        let mut dropped = 0usize;

        for entry in polyline {
            let display = match entry {
                Some(p) => self.to_display(*p),
                None => {
                    previous = None;
                    continue;
                }
            };

            let Some(display) = display else {
                dropped += 1;
                previous = None;
                continue;
            };

            match previous {
                Some(prev) => segments.push(Segment::new(prev, display, chain)),
                None => {
                    chain = chains;
                    chains += 1;
                }
            }
            previous = Some(display);
        }

        if dropped > 0 {
            tracing::debug!(dropped, "Contour points outside the view projection");
        }

        Ok(segments)
    }
}
