//! Common test fixtures: projections and recording collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use contour_common::{ContourTracer, LevelStyle, Polyline, Segment, SegmentSink, TraceError};
use parking_lot::{Condvar, Mutex};
use projection::{Projection, SkyCoord, TangentProjection};

/// Sky position used as the reference value of test projections (M42).
pub const REFERENCE_SKY: SkyCoord = SkyCoord {
    ra: 83.822,
    dec: -5.391,
};

/// Plate scale of test projections, arcsec per pixel.
pub const PIXEL_SCALE: f64 = 1.0;

/// A north-up TAN projection with its reference pixel at `crpix`.
///
/// Two of these that differ only in `crpix` map pixels onto each other by a
/// pure translation.
pub fn tan_projection(crpix: (f64, f64)) -> Arc<dyn Projection> {
    rotated_tan_projection(crpix, 0.0)
}

/// A TAN projection rotated by `rotation_deg`.
pub fn rotated_tan_projection(crpix: (f64, f64), rotation_deg: f64) -> Arc<dyn Projection> {
    match TangentProjection::from_scale(crpix, REFERENCE_SKY, PIXEL_SCALE, rotation_deg) {
        Ok(p) => Arc::new(p),
        Err(e) => panic!("invalid test projection: {}", e),
    }
}

/// One `contours()` call observed by a [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq)]
pub struct TraceCall {
    pub width: usize,
    pub height: usize,
    pub grid_len: usize,
    pub level: f32,
}

/// Shared view of the calls a [`RecordingTracer`] has seen.
#[derive(Debug, Clone, Default)]
pub struct TraceLog(Arc<Mutex<Vec<TraceCall>>>);

impl TraceLog {
    pub fn calls(&self) -> Vec<TraceCall> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn levels(&self) -> Vec<f32> {
        self.0.lock().iter().map(|c| c.level).collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Blocks tracer calls while closed. Starts open.
#[derive(Debug, Clone, Default)]
pub struct Gate(Arc<(Mutex<bool>, Condvar)>);

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        *self.0 .0.lock() = true;
    }

    pub fn open(&self) {
        *self.0 .0.lock() = false;
        self.0 .1.notify_all();
    }

    /// Wait until the gate is open.
    pub fn pass(&self) {
        let (closed, opened) = &*self.0;
        let mut closed = closed.lock();
        while *closed {
            opened.wait(&mut closed);
        }
    }
}

/// Wraps a tracer and records every traced level.
///
/// Optionally fails with `OutOfMemory` once a given number of calls have
/// succeeded, or waits on a [`Gate`] before each call.
pub struct RecordingTracer {
    inner: Box<dyn ContourTracer>,
    log: TraceLog,
    grid: Option<(usize, usize, usize)>,
    level: f32,
    fail_after: Option<usize>,
    gate: Option<Gate>,
}

impl RecordingTracer {
    pub fn new(inner: impl ContourTracer + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            log: TraceLog::default(),
            grid: None,
            level: 0.0,
            fail_after: None,
            gate: None,
        }
    }

    /// Fail every call after the first `calls` successful ones.
    pub fn fail_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Hold every call until `gate` is open.
    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn log(&self) -> TraceLog {
        self.log.clone()
    }
}

impl ContourTracer for RecordingTracer {
    fn set_grid(&mut self, data: Arc<[f32]>, width: usize, height: usize) {
        self.grid = Some((width, height, data.len()));
        self.inner.set_grid(data, width, height);
    }

    fn set_level(&mut self, level: f32) {
        self.level = level;
        self.inner.set_level(level);
    }

    fn contours(&mut self) -> Result<Polyline, TraceError> {
        let (width, height, grid_len) = self.grid.ok_or(TraceError::NoGrid)?;

        if let Some(gate) = &self.gate {
            gate.pass();
        }

        if let Some(limit) = self.fail_after {
            if self.log.len() >= limit {
                return Err(TraceError::OutOfMemory {
                    requested: width * height,
                });
            }
        }

        self.log.0.lock().push(TraceCall {
            width,
            height,
            grid_len,
            level: self.level,
        });
        self.inner.contours()
    }
}

/// Tracer returning the same polyline for every level.
#[derive(Debug, Clone, Default)]
pub struct FixedTracer {
    pub polyline: Polyline,
}

impl FixedTracer {
    pub fn new(polyline: Polyline) -> Self {
        Self { polyline }
    }
}

impl ContourTracer for FixedTracer {
    fn set_grid(&mut self, _data: Arc<[f32]>, _width: usize, _height: usize) {}

    fn set_level(&mut self, _level: f32) {}

    fn contours(&mut self) -> Result<Polyline, TraceError> {
        Ok(self.polyline.clone())
    }
}

/// A call made on a [`RecordingSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Add(usize),
    RemoveAll(usize),
    Repaint,
}

/// Segment sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    levels: BTreeMap<usize, Vec<(Segment, Arc<LevelStyle>)>>,
    events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self, level: usize) -> Vec<Segment> {
        self.levels
            .get(&level)
            .map(|segs| segs.iter().map(|(s, _)| *s).collect())
            .unwrap_or_default()
    }

    /// Style shared by the segments of `level`, if it has any.
    pub fn style(&self, level: usize) -> Option<Arc<LevelStyle>> {
        self.levels
            .get(&level)
            .and_then(|segs| segs.first())
            .map(|(_, style)| Arc::clone(style))
    }

    pub fn segment_count(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    pub fn repaint_count(&self) -> usize {
        self.count(SinkEvent::Repaint)
    }

    pub fn removal_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::RemoveAll(_)))
            .count()
    }

    pub fn count(&self, event: SinkEvent) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl SegmentSink for RecordingSink {
    fn add_segment(&mut self, level: usize, segment: Segment, style: &Arc<LevelStyle>) {
        self.levels
            .entry(level)
            .or_default()
            .push((segment, Arc::clone(style)));
        self.events.push(SinkEvent::Add(level));
    }

    fn remove_all_segments(&mut self, level: usize) {
        self.levels.remove(&level);
        self.events.push(SinkEvent::RemoveAll(level));
    }

    fn request_repaint(&mut self) {
        self.events.push(SinkEvent::Repaint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contour_common::{Point, Rgba};

    #[test]
    fn test_recording_tracer_fails_after_limit() {
        let mut tracer = RecordingTracer::new(FixedTracer::default()).fail_after(1);
        let log = tracer.log();
        tracer.set_grid(vec![0.0; 4].into(), 2, 2);
        tracer.set_level(3.0);

        assert!(tracer.contours().is_ok());
        assert!(matches!(tracer.contours(), Err(TraceError::OutOfMemory { .. })));
        assert_eq!(log.levels(), vec![3.0]);
    }

    #[test]
    fn test_gate_releases_blocked_tracer() {
        let gate = Gate::new();
        gate.close();
        let mut tracer = RecordingTracer::new(FixedTracer::default()).gated(gate.clone());
        let log = tracer.log();

        let worker = std::thread::spawn(move || {
            tracer.set_grid(vec![0.0; 4].into(), 2, 2);
            tracer.contours().is_ok()
        });
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(log.is_empty());

        gate.open();
        assert!(worker.join().unwrap());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_recording_sink_tracks_levels() {
        let mut sink = RecordingSink::new();
        let style = Arc::new(LevelStyle::new(Rgba::default(), true));
        let seg = Segment::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0), 0);

        sink.add_segment(2, seg, &style);
        sink.request_repaint();
        assert_eq!(sink.segments(2), vec![seg]);
        assert!(sink.style(2).is_some());

        sink.remove_all_segments(2);
        assert!(sink.segments(2).is_empty());
        assert_eq!(sink.repaint_count(), 1);
        assert_eq!(sink.removal_count(), 1);
    }

    #[test]
    fn test_translated_projections() {
        let a = tan_projection((10.0, 10.0));
        let b = tan_projection((20.0, 10.0));
        let sky = a.pixel_to_sky(Point::new(15.0, 12.0)).unwrap();
        let p = b.sky_to_pixel(sky).unwrap();
        assert!((p.x - 25.0).abs() < 1e-6);
        assert!((p.y - 12.0).abs() < 1e-6);
    }
}
