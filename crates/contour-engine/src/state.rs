//! Committed contour state of one overlay.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use contour_common::{ContourError, Polyline, Result, Rgba, Segment, SegmentSink};
use tracing::debug;

use crate::adjust::LevelUpdate;
use crate::levels::LevelSet;
use crate::presentation::PresentationState;
use crate::sampler::WorkingGrid;

/// Everything a successful computation leaves behind, plus the sink it was
/// installed into.
///
/// Workers build new data off-lock and only swap it in here, so a failed
/// operation never leaves a half-updated level behind.
pub struct ContourState<S> {
    pub(crate) sink: S,
    pub(crate) levels: Option<LevelSet>,
    pub(crate) contours: Vec<Polyline>,
    pub(crate) grid: Option<Arc<WorkingGrid>>,
    pub(crate) presentation: PresentationState,
    /// Bumped whenever the level set is replaced or dropped.
    pub(crate) revision: u64,
}

impl<S: SegmentSink> ContourState<S> {
    pub fn new(sink: S, base_color: Rgba) -> Self {
        Self {
            sink,
            levels: None,
            contours: Vec::new(),
            grid: None,
            presentation: PresentationState::new(base_color, 0),
            revision: 0,
        }
    }

    /// Replace the whole contour set with the result of a full computation.
    pub fn replace_all(
        &mut self,
        levels: LevelSet,
        contours: Vec<Polyline>,
        rendered: Vec<Vec<Segment>>,
        grid: Option<Arc<WorkingGrid>>,
    ) -> Result<()> {
        debug_assert_eq!(levels.len(), contours.len());
        debug_assert_eq!(levels.len(), rendered.len());

        self.presentation.clear(&mut self.sink);

        let mut presentation = PresentationState::new(self.presentation.base_color(), levels.len());
        for (index, segments) in rendered.into_iter().enumerate() {
            presentation.install(index, segments, &mut self.sink)?;
        }

        self.presentation = presentation;
        self.levels = Some(levels);
        self.contours = contours;
        self.grid = grid;
        self.revision += 1;
        self.sink.request_repaint();
        Ok(())
    }

    /// Swap in one re-traced level.
    ///
    /// Nothing is touched unless the index is valid for the current set.
    pub fn commit_level(&mut self, update: LevelUpdate) -> Result<()> {
        let levels = self.levels.as_mut().ok_or(ContourError::NotReady)?;
        levels.replace(update.index, update.record)?;

        self.contours[update.index] = update.polyline;
        self.presentation
            .install(update.index, update.segments, &mut self.sink)?;

        debug!(
            index = update.index,
            level = update.record.user_level,
            "Committed level adjustment"
        );
        Ok(())
    }

    /// Drop every buffer and remove all segments from the sink.
    pub fn clear(&mut self) {
        self.presentation.clear(&mut self.sink);
        self.presentation = PresentationState::new(self.presentation.base_color(), 0);
        self.levels = None;
        self.contours = Vec::new();
        self.grid = None;
        self.revision += 1;
        self.sink.request_repaint();
    }

    /// Identifies the current level set; changes on every full commit and
    /// on `clear`.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn level_set(&self) -> Option<&LevelSet> {
        self.levels.as_ref()
    }

    pub fn contours(&self) -> &[Polyline] {
        &self.contours
    }

    pub fn grid(&self) -> Option<&Arc<WorkingGrid>> {
        self.grid.as_ref()
    }

    pub fn presentation(&self) -> &PresentationState {
        &self.presentation
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Fingerprint of the geometry: traced polylines and the display-space
    /// segments built from them. Colors and visibility are not included.
    pub fn geometry_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        for polyline in &self.contours {
            polyline.len().hash(&mut hasher);
            for entry in polyline {
                match entry {
                    Some(p) => {
                        p.x.to_bits().hash(&mut hasher);
                        p.y.to_bits().hash(&mut hasher);
                    }
                    None => u64::MAX.hash(&mut hasher),
                }
            }
        }

        for index in 0..self.presentation.level_count() {
            for seg in self.presentation.segments(index) {
                for v in [seg.start.x, seg.start.y, seg.end.x, seg.end.y] {
                    v.to_bits().hash(&mut hasher);
                }
                seg.chain.hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}
