//! Per-level colors, visibility and installed segments.
//!
//! Color and visibility live in one shared [`LevelStyle`] per level that every
//! segment handed to the sink refers to, so neither change needs segments to
//! be rebuilt.

use std::sync::Arc;

use contour_common::{brightness_variants, ContourError, LevelStyle, Result, Rgba, Segment, SegmentSink};

/// Drawable state of one level.
#[derive(Debug, Clone)]
pub struct RenderedLevel {
    pub segments: Vec<Segment>,
    pub style: Arc<LevelStyle>,
}

/// Colors, visibility and segments for every level of a contour set.
#[derive(Debug, Clone)]
pub struct PresentationState {
    base_color: Rgba,
    colors: Vec<Rgba>,
    levels: Vec<RenderedLevel>,
}

impl PresentationState {
    /// All levels visible, no segments yet.
    pub fn new(base_color: Rgba, level_count: usize) -> Self {
        let colors = brightness_variants(base_color, level_count);
        let levels = colors
            .iter()
            .map(|&c| RenderedLevel {
                segments: Vec::new(),
                style: Arc::new(LevelStyle::new(c, true)),
            })
            .collect();

        Self {
            base_color,
            colors,
            levels,
        }
    }

    pub fn base_color(&self) -> Rgba {
        self.base_color
    }

    /// Current color assignment, one entry per level.
    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, index: usize) -> Option<&RenderedLevel> {
        self.levels.get(index)
    }

    pub fn segments(&self, index: usize) -> &[Segment] {
        self.levels
            .get(index)
            .map(|l| l.segments.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the segments of one level in the sink.
    ///
    /// The level gets a fresh style in its assigned color; its visibility is
    /// carried over from the style being replaced.
    pub fn install<S: SegmentSink + ?Sized>(
        &mut self,
        index: usize,
        segments: Vec<Segment>,
        sink: &mut S,
    ) -> Result<()> {
        let len = self.levels.len();
        let color = *self
            .colors
            .get(index)
            .ok_or(ContourError::LevelOutOfRange { index, len })?;
        let level = &mut self.levels[index];

        let visible = level.style.is_visible();
        sink.remove_all_segments(index);

        let style = Arc::new(LevelStyle::new(color, true));
        for seg in &segments {
            sink.add_segment(index, *seg, &style);
        }
        style.set_visible(visible);

        level.segments = segments;
        level.style = style;
        Ok(())
    }

    /// Regenerate the color assignment and repaint every level in place.
    pub fn set_base_color(&mut self, color: Rgba) {
        self.base_color = color;
        self.colors = brightness_variants(color, self.levels.len());
        for (level, &c) in self.levels.iter_mut().zip(&self.colors) {
            level.style.set_color(c);
        }
    }

    pub fn set_visible(&self, index: usize, visible: bool) -> Result<()> {
        self.style(index)?.set_visible(visible);
        Ok(())
    }

    /// Visibility of a level, read from the style its segments share.
    ///
    /// A level with no segments still has a style, so the last value set is
    /// reported.
    pub fn is_visible(&self, index: usize) -> Result<bool> {
        Ok(self.style(index)?.is_visible())
    }

    fn style(&self, index: usize) -> Result<&Arc<LevelStyle>> {
        let len = self.levels.len();
        self.levels
            .get(index)
            .map(|l| &l.style)
            .ok_or(ContourError::LevelOutOfRange { index, len })
    }

    /// Remove every level's segments from the sink.
    pub fn clear<S: SegmentSink + ?Sized>(&mut self, sink: &mut S) {
        for (index, level) in self.levels.iter_mut().enumerate() {
            sink.remove_all_segments(index);
            level.segments.clear();
        }
    }
}

/// Hands out base colors to successive overlays of one owner.
///
/// Once the palette is exhausted it starts over, each round a little darker
/// so that overlays stay distinguishable.
#[derive(Debug, Clone)]
pub struct ColorAllocator {
    palette: Vec<Rgba>,
    next: usize,
}

impl ColorAllocator {
    pub fn new(palette: Vec<Rgba>) -> Self {
        Self { palette, next: 0 }
    }

    pub fn next_color(&mut self) -> Rgba {
        if self.palette.is_empty() {
            return Rgba::default();
        }

        let round = self.next / self.palette.len();
        let color = self.palette[self.next % self.palette.len()];
        self.next += 1;

        color.with_brightness(0.8f64.powi(round as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contour_common::Point;

    #[derive(Default)]
    struct CountingSink {
        added: usize,
        removed: Vec<usize>,
    }

    impl SegmentSink for CountingSink {
        fn add_segment(&mut self, _level: usize, _segment: Segment, _style: &Arc<LevelStyle>) {
            self.added += 1;
        }

        fn remove_all_segments(&mut self, level: usize) {
            self.removed.push(level);
        }

        fn request_repaint(&mut self) {}
    }

    fn seg() -> Segment {
        Segment::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0), 0)
    }

    #[test]
    fn test_install_keeps_hidden_level_hidden() {
        let mut state = PresentationState::new(Rgba::opaque(0, 200, 0), 2);
        let mut sink = CountingSink::default();
        state.set_visible(1, false).unwrap();

        state.install(1, vec![seg(), seg()], &mut sink).unwrap();

        assert!(!state.is_visible(1).unwrap());
        assert!(state.is_visible(0).unwrap());
        assert_eq!(sink.added, 2);
        assert_eq!(sink.removed, vec![1]);
    }

    #[test]
    fn test_base_color_repaints_in_place() {
        let mut state = PresentationState::new(Rgba::opaque(0, 200, 0), 3);
        let mut sink = CountingSink::default();
        state.install(0, vec![seg()], &mut sink).unwrap();
        let style = Arc::clone(&state.level(0).unwrap().style);

        state.set_base_color(Rgba::opaque(200, 0, 0));

        assert_eq!(style.color(), state.colors()[0]);
        assert_eq!(state.segments(0).len(), 1);
        assert_eq!(sink.added, 1);
    }

    #[test]
    fn test_out_of_range_level() {
        let state = PresentationState::new(Rgba::default(), 1);
        assert_eq!(
            state.is_visible(4),
            Err(ContourError::LevelOutOfRange { index: 4, len: 1 })
        );
    }

    #[test]
    fn test_allocator_cycles_darker() {
        let mut alloc = ColorAllocator::new(vec![Rgba::opaque(100, 100, 100)]);
        assert_eq!(alloc.next_color(), Rgba::opaque(100, 100, 100));
        assert_eq!(alloc.next_color(), Rgba::opaque(80, 80, 80));
    }
}
