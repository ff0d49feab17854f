//! Level sets and multi-level tracing.

use contour_common::{ContourError, ContourTracer, Polyline, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sampler::WorkingGrid;

/// One requested threshold.
///
/// `user_level` is what the caller asked for and what is reported back;
/// `traced_level` is what the tracer sees after compensating for block
/// summation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelRecord {
    pub user_level: f64,
    pub traced_level: f64,
}

impl LevelRecord {
    pub fn new(user_level: f64, scale: f64) -> Self {
        Self {
            user_level,
            traced_level: user_level * scale,
        }
    }
}

/// Ordered, fixed-length sequence of thresholds.
///
/// Entries may be replaced but the length never changes after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    records: Vec<LevelRecord>,
}

impl LevelSet {
    /// Build a level set, scaling every level by `scale`.
    pub fn new(levels: &[f64], scale: f64, max_levels: usize) -> Result<Self> {
        validate_levels(levels, max_levels)?;

        Ok(Self {
            records: levels.iter().map(|&l| LevelRecord::new(l, scale)).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LevelRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelRecord> {
        self.records.iter()
    }

    pub fn user_levels(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.user_level).collect()
    }

    pub fn traced_levels(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.traced_level).collect()
    }

    /// Replace entry `index`.
    pub fn replace(&mut self, index: usize, record: LevelRecord) -> Result<()> {
        let len = self.records.len();
        let slot = self
            .records
            .get_mut(index)
            .ok_or(ContourError::LevelOutOfRange { index, len })?;
        *slot = record;
        Ok(())
    }
}

/// Check a requested level list before any work starts.
pub fn validate_levels(levels: &[f64], max_levels: usize) -> Result<()> {
    if levels.len() > max_levels {
        return Err(ContourError::TooManyLevels {
            requested: levels.len(),
            max: max_levels,
        });
    }
    if let Some(bad) = levels.iter().find(|l| !l.is_finite()) {
        return Err(ContourError::invalid_request(format!("level {} is not finite", bad)));
    }
    Ok(())
}

/// Fraction of the tracing phase completed after `levels_done` levels.
///
/// The tracer has no intra-level callback, so progress moves in whole
/// levels.
pub fn tracing_progress(levels_done: usize, total_levels: usize) -> f32 {
    if total_levels == 0 {
        return 1.0;
    }
    (levels_done as f32 / total_levels as f32).min(1.0)
}

/// Trace one level against `grid`.
pub fn trace_level(
    tracer: &mut dyn ContourTracer,
    grid: &WorkingGrid,
    record: &LevelRecord,
) -> Result<Polyline> {
    tracer.set_grid(grid.data.clone(), grid.width, grid.height);
    tracer.set_level(record.traced_level as f32);
    Ok(tracer.contours()?)
}

/// Trace every level in order.
///
/// `on_progress` receives the tracing fraction once after each level. The first
/// failure aborts the batch and whatever was traced so far is dropped.
pub fn trace_levels(
    tracer: &mut dyn ContourTracer,
    grid: &WorkingGrid,
    levels: &LevelSet,
    mut on_progress: impl FnMut(f32),
) -> Result<Vec<Polyline>> {
    let total = levels.len();
    let mut contours = Vec::new();
    contours
        .try_reserve_exact(total)
        .map_err(|_| ContourError::resource_exhausted("tracing contours", total))?;

    tracer.set_grid(grid.data.clone(), grid.width, grid.height);

    for (done, record) in levels.iter().enumerate() {
        tracer.set_level(record.traced_level as f32);
        let polyline = tracer.contours()?;

        debug!(
            level = record.user_level,
            traced_level = record.traced_level,
            points = polyline.len(),
            "Traced contour level"
        );

        contours.push(polyline);
        on_progress(tracing_progress(done + 1, total));
    }

    Ok(contours)
}

/// Range of the finite values in `data`.
pub fn data_range(data: &[f32]) -> Option<(f32, f32)> {
    data.iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// `count` evenly spaced levels strictly between `min` and `max`.
pub fn generate_levels(min: f64, max: f64, count: usize) -> Vec<f64> {
    if count == 0 || min.is_nan() || max.is_nan() || max <= min {
        return vec![];
    }

    let step = (max - min) / (count + 1) as f64;
    (1..=count).map(|i| min + step * i as f64).collect()
}

/// Levels at every multiple of `interval` within `[min, max]`.
pub fn levels_by_interval(min: f64, max: f64, interval: f64) -> Vec<f64> {
    if interval <= 0.0 || max <= min {
        return vec![];
    }

    let start = (min / interval).ceil() as i64;
    let end = (max / interval).floor() as i64;
    (start..=end).map(|i| i as f64 * interval).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{FixedTracer, RecordingTracer};

    #[test]
    fn test_level_set_scales_but_reports_user_levels() {
        let set = LevelSet::new(&[10.0, 50.0], 4.0, 20).unwrap();
        assert_eq!(set.user_levels(), vec![10.0, 50.0]);
        assert_eq!(set.traced_levels(), vec![40.0, 200.0]);
    }

    #[test]
    fn test_level_set_length_limit() {
        let levels: Vec<f64> = (0..21).map(|v| v as f64).collect();
        assert_eq!(
            LevelSet::new(&levels, 1.0, 20),
            Err(ContourError::TooManyLevels { requested: 21, max: 20 })
        );
    }

    #[test]
    fn test_nan_level_rejected() {
        assert!(matches!(
            LevelSet::new(&[1.0, f64::NAN], 1.0, 20),
            Err(ContourError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_replace_out_of_range() {
        let mut set = LevelSet::new(&[1.0], 1.0, 20).unwrap();
        assert_eq!(
            set.replace(3, LevelRecord::new(2.0, 1.0)),
            Err(ContourError::LevelOutOfRange { index: 3, len: 1 })
        );
        set.replace(0, LevelRecord::new(2.0, 1.0)).unwrap();
        assert_eq!(set.user_levels(), vec![2.0]);
    }

    #[test]
    fn test_tracing_progress() {
        assert_eq!(tracing_progress(0, 4), 0.0);
        assert_eq!(tracing_progress(3, 4), 0.75);
        assert_eq!(tracing_progress(4, 4), 1.0);
        assert_eq!(tracing_progress(0, 0), 1.0);
    }

    #[test]
    fn test_trace_levels_reports_once_per_level() {
        let grid = WorkingGrid {
            data: vec![0.0f32; 16].into(),
            width: 4,
            height: 4,
            origin: (0, 0),
            factor: 1,
            denoised: false,
        };
        let levels = LevelSet::new(&[1.0, 2.0, 3.0, 4.0], 1.0, 20).unwrap();
        let mut tracer = FixedTracer::default();
        let mut reported = Vec::new();

        let contours = trace_levels(&mut tracer, &grid, &levels, |p| reported.push(p)).unwrap();

        assert_eq!(contours.len(), 4);
        assert_eq!(reported, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_trace_levels_stops_reporting_on_failure() {
        let grid = WorkingGrid {
            data: vec![0.0f32; 16].into(),
            width: 4,
            height: 4,
            origin: (0, 0),
            factor: 1,
            denoised: false,
        };
        let levels = LevelSet::new(&[1.0, 2.0, 3.0, 4.0], 1.0, 20).unwrap();
        let mut tracer = RecordingTracer::new(FixedTracer::default()).fail_after(2);
        let mut reported = Vec::new();

        let result = trace_levels(&mut tracer, &grid, &levels, |p| reported.push(p));

        assert!(matches!(result, Err(ContourError::ResourceExhausted { .. })));
        assert_eq!(reported, vec![0.25, 0.5]);
    }

    #[test]
    fn test_generate_levels() {
        assert_eq!(generate_levels(0.0, 100.0, 3), vec![25.0, 50.0, 75.0]);
        assert!(generate_levels(5.0, 5.0, 3).is_empty());
    }

    #[test]
    fn test_levels_by_interval() {
        assert_eq!(levels_by_interval(3.0, 27.0, 5.0), vec![5.0, 10.0, 15.0, 20.0, 25.0]);
        assert!(levels_by_interval(0.0, 10.0, 0.0).is_empty());
    }

    #[test]
    fn test_data_range_skips_nan() {
        assert_eq!(data_range(&[f32::NAN, 3.0, -1.0]), Some((-1.0, 3.0)));
        assert_eq!(data_range(&[f32::NAN]), None);
    }
}
