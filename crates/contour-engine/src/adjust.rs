//! Single-level recomputation against the resident working grid.

use std::collections::BTreeMap;
use std::sync::Arc;

use contour_common::{ContourTracer, Polyline, Result, Segment};
use projection::Projection;

use crate::levels::{trace_level, LevelRecord, LevelSet};
use crate::projector::ContourProjector;
use crate::sampler::WorkingGrid;

/// Level changes staged by the caller and not yet applied.
///
/// Entries belong to the contour-state revision they were staged against.
/// Once a full computation or `free` moves the state on, they no longer
/// name the same levels and are dropped. Staging the same index twice keeps
/// the latest value.
#[derive(Debug, Clone, Default)]
pub struct PendingAdjustments {
    revision: u64,
    values: BTreeMap<usize, f64>,
}

impl PendingAdjustments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, revision: u64, index: usize, value: f64) {
        if revision != self.revision {
            self.values.clear();
            self.revision = revision;
        }
        self.values.insert(index, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Take every staged change, keeping only values that differ from what
    /// `levels` already holds. Results are in index order.
    ///
    /// Nothing is returned when the entries were staged against another
    /// revision than `revision`.
    pub fn take_changed(&mut self, revision: u64, levels: &LevelSet) -> Vec<(usize, f64)> {
        let values = std::mem::take(&mut self.values);
        if revision != self.revision {
            self.revision = revision;
            return Vec::new();
        }

        values
            .into_iter()
            .filter(|&(index, value)| {
                levels
                    .get(index)
                    .map_or(true, |record| record.user_level != value)
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// A re-traced and re-projected level, ready to be committed.
#[derive(Debug, Clone)]
pub struct LevelUpdate {
    pub index: usize,
    pub record: LevelRecord,
    pub polyline: Polyline,
    pub segments: Vec<Segment>,
}

/// Re-trace level `index` at `value` and project the result.
///
/// The value is scaled exactly like a full computation would scale it.
/// Nothing is committed here; a failure leaves the level as it was.
pub fn prepare_update(
    tracer: &mut dyn ContourTracer,
    grid: &WorkingGrid,
    source: Arc<dyn Projection>,
    view: Arc<dyn Projection>,
    index: usize,
    value: f64,
) -> Result<LevelUpdate> {
    let record = LevelRecord::new(value, grid.level_scale());
    let polyline = trace_level(tracer, grid, &record)?;
    let segments = ContourProjector::new(grid, source, view).project(&polyline)?;

    Ok(LevelUpdate {
        index,
        record,
        polyline,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_values_are_skipped() {
        let levels = LevelSet::new(&[10.0, 20.0, 30.0], 1.0, 20).unwrap();
        let mut pending = PendingAdjustments::new();
        pending.stage(0, 0, 10.0);
        pending.stage(0, 2, 35.0);
        pending.stage(0, 1, 25.0);
        pending.stage(0, 1, 20.0);

        assert_eq!(pending.take_changed(0, &levels), vec![(2, 35.0)]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_stale_revision_is_dropped() {
        let levels = LevelSet::new(&[30.0, 40.0], 1.0, 20).unwrap();
        let mut pending = PendingAdjustments::new();
        pending.stage(1, 0, 15.0);

        assert!(pending.take_changed(2, &levels).is_empty());
        assert!(pending.is_empty());

        pending.stage(2, 1, 45.0);
        assert_eq!(pending.take_changed(2, &levels), vec![(1, 45.0)]);
    }

    #[test]
    fn test_staging_under_new_revision_discards_old_entries() {
        let levels = LevelSet::new(&[0.0; 3], 1.0, 20).unwrap();
        let mut pending = PendingAdjustments::new();
        pending.stage(3, 0, 1.0);
        pending.stage(4, 2, 5.0);

        assert_eq!(pending.len(), 1);
        assert_eq!(pending.take_changed(4, &levels), vec![(2, 5.0)]);
    }
}
