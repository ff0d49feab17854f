//! Caller-facing contour overlay.
//!
//! A [`ContourOverlay`] owns the contour state derived from one source image
//! and pushes it into a [`SegmentSink`]. Full computations and adjustment
//! batches run in the background through a [`ComputationScheduler`]; color
//! and visibility changes apply immediately.

use std::sync::Arc;
use std::time::Instant;

use contour_common::{
    ContourError, ContourTracer, PixelRect, Polyline, Result, Rgba, Segment, SegmentSink,
};
use parking_lot::Mutex;
use renderer::MarchingSquaresTracer;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::adjust::{prepare_update, PendingAdjustments};
use crate::config::EngineConfig;
use crate::levels::{trace_levels, validate_levels, LevelSet};
use crate::presentation::ColorAllocator;
use crate::projector::ContourProjector;
use crate::sampler::{RasterSampler, SamplingParams, WorkingGrid};
use crate::scheduler::{ComputationScheduler, OperationKind, Phase, ProgressReporter, Status};
use crate::source::{SourceImage, ViewState};
use crate::state::ContourState;

/// Parameters of a full computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourRequest {
    pub levels: Vec<f64>,
    /// Block-sum downsampling; only active with a factor above 1.
    pub smoothing: bool,
    pub smoothing_factor: usize,
    pub denoise: bool,
    /// Restrict the computation to this region of the source image.
    pub viewport: Option<PixelRect>,
}

impl Default for ContourRequest {
    fn default() -> Self {
        Self {
            levels: Vec::new(),
            smoothing: false,
            smoothing_factor: 1,
            denoise: false,
            viewport: None,
        }
    }
}

impl ContourRequest {
    pub fn new(levels: Vec<f64>) -> Self {
        Self {
            levels,
            ..Self::default()
        }
    }

    pub fn with_smoothing(mut self, factor: usize) -> Self {
        self.smoothing = true;
        self.smoothing_factor = factor;
        self
    }

    pub fn with_denoise(mut self, denoise: bool) -> Self {
        self.denoise = denoise;
        self
    }

    pub fn with_viewport(mut self, viewport: PixelRect) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn sampling_params(&self) -> Result<SamplingParams> {
        if self.smoothing && self.smoothing_factor == 0 {
            return Err(ContourError::invalid_request("smoothing factor must be >= 1"));
        }

        let factor = if self.smoothing { self.smoothing_factor } else { 1 };
        Ok(SamplingParams {
            factor,
            denoise: self.denoise,
            region: self.viewport,
        })
    }
}

struct OverlayInner<S> {
    source: Arc<dyn SourceImage>,
    view: Arc<ViewState>,
    config: EngineConfig,
    sampler: RasterSampler,
    tracer: Mutex<Box<dyn ContourTracer>>,
    state: Mutex<ContourState<S>>,
}

impl<S: SegmentSink> OverlayInner<S> {
    #[instrument(skip_all, fields(levels = request.levels.len()))]
    fn compute(&self, request: &ContourRequest, progress: &ProgressReporter) -> Result<()> {
        let started = Instant::now();
        let sampling_weight = self.config.sampling_weight;
        let tracing_weight = self.config.tracing_weight;
        let projecting_weight = self.config.projecting_weight;

        progress.report(Phase::Sampling, 0.0);
        let params = request.sampling_params()?;
        let grid = self.sampler.sample(self.source.as_ref(), &params)?;
        let levels = LevelSet::new(&request.levels, grid.level_scale(), self.config.max_levels)?;

        progress.report(Phase::Tracing, sampling_weight);
        let contours = {
            let mut tracer = self.tracer.lock();
            trace_levels(&mut **tracer, &grid, &levels, |fraction| {
                progress.report(Phase::Tracing, sampling_weight + tracing_weight * fraction)
            })?
        };

        let projected_base = sampling_weight + tracing_weight;
        progress.report(Phase::Projecting, projected_base);
        let projector = ContourProjector::new(&grid, self.source.projection(), self.view.projection());
        let total = contours.len();
        let mut rendered = Vec::new();
        rendered
            .try_reserve_exact(total)
            .map_err(|_| ContourError::resource_exhausted("projecting contours", total))?;
        for (done, polyline) in contours.iter().enumerate() {
            rendered.push(projector.project(polyline)?);
            progress.report(
                Phase::Projecting,
                projected_base + projecting_weight * (done + 1) as f32 / total as f32,
            );
        }

        let segments: usize = rendered.iter().map(Vec::len).sum();
        let reprojected = projector.needs_reprojection();
        drop(projector);
        let (width, height, factor) = (grid.width, grid.height, grid.factor);
        let grid = self.config.retain_working_grid.then(|| Arc::new(grid));

        let mut state = self.state.lock();
        if !progress.is_current() {
            debug!("Full computation superseded, discarding results");
            return Ok(());
        }
        state.replace_all(levels, contours, rendered, grid)?;

        info!(
            width,
            height,
            factor,
            segments,
            reprojected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Contours computed"
        );
        Ok(())
    }

    #[instrument(skip_all, fields(levels = batch.len()))]
    fn adjust(&self, batch: Vec<(usize, f64)>, progress: &ProgressReporter) -> Result<()> {
        let started = Instant::now();
        let grid = self
            .state
            .lock()
            .grid()
            .cloned()
            .ok_or(ContourError::NotReady)?;

        let total = batch.len();
        let mut committed = 0;
        let outcome = self.adjust_levels(&grid, batch, progress, &mut committed);

        // Levels committed before a failure stay committed
        if committed > 0 {
            self.state.lock().sink.request_repaint();
        }
        outcome?;

        info!(
            adjusted = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Levels adjusted"
        );
        Ok(())
    }

    fn adjust_levels(
        &self,
        grid: &WorkingGrid,
        batch: Vec<(usize, f64)>,
        progress: &ProgressReporter,
        committed: &mut usize,
    ) -> Result<()> {
        let total = batch.len();
        for (done, (index, value)) in batch.into_iter().enumerate() {
            let update = {
                let mut tracer = self.tracer.lock();
                prepare_update(
                    &mut **tracer,
                    grid,
                    self.source.projection(),
                    self.view.projection(),
                    index,
                    value,
                )?
            };

            let mut state = self.state.lock();
            if !progress.is_current() {
                debug!("Adjustment superseded, discarding results");
                return Ok(());
            }
            state.commit_level(update)?;
            *committed += 1;
            progress.report(Phase::AdjustingLevel, (done + 1) as f32 / total as f32);
        }
        Ok(())
    }
}

/// Contours of one source image, displayed in one view.
pub struct ContourOverlay<S> {
    inner: Arc<OverlayInner<S>>,
    pending: Mutex<PendingAdjustments>,
    scheduler: ComputationScheduler,
}

impl<S: SegmentSink + 'static> ContourOverlay<S> {
    pub fn builder(
        source: Arc<dyn SourceImage>,
        view: Arc<ViewState>,
        sink: S,
    ) -> ContourOverlayBuilder<S> {
        ContourOverlayBuilder {
            source,
            view,
            sink,
            config: None,
            tracer: None,
            base_color: None,
            runtime: None,
        }
    }

    /// Start a full computation in the background.
    ///
    /// Level count and smoothing are checked before anything is submitted.
    /// Previously committed contours stay displayed until the new ones are
    /// ready, and remain if the computation fails.
    pub fn compute_all(&self, request: ContourRequest) -> Result<()> {
        validate_levels(&request.levels, self.inner.config.max_levels)?;
        request.sampling_params()?;

        let inner = Arc::clone(&self.inner);
        let generation = self
            .scheduler
            .submit(OperationKind::Compute, move |progress| inner.compute(&request, progress))?;

        // Adjustments staged against the old level set no longer apply
        self.pending.lock().clear();
        debug!(generation, "Submitted full computation");
        Ok(())
    }

    /// Change one level and recompute only that level.
    ///
    /// Rejected with `Busy`, without staging anything, while another
    /// operation is in flight.
    pub fn adjust_level(&self, index: usize, value: f64) -> Result<()> {
        if self.scheduler.is_busy() {
            return Err(ContourError::Busy);
        }
        self.stage_adjustment(index, value)?;
        self.apply_adjustments()
    }

    /// Record a level change to be applied with the next
    /// [`apply_adjustments`](Self::apply_adjustments).
    ///
    /// The change is tied to the current level set. A full computation
    /// committed before it is applied discards it.
    pub fn stage_adjustment(&self, index: usize, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(ContourError::invalid_request(format!(
                "level {} is not finite",
                value
            )));
        }

        let state = self.inner.state.lock();
        if state.grid().is_none() {
            return Err(ContourError::NotReady);
        }
        let len = state.level_set().map_or(0, LevelSet::len);
        if index >= len {
            return Err(ContourError::LevelOutOfRange { index, len });
        }

        self.pending.lock().stage(state.revision(), index, value);
        Ok(())
    }

    /// Apply every staged change whose value differs from the current one.
    ///
    /// Does nothing, not even a repaint, when no staged value differs. A
    /// batch rejected with `Busy` is dropped and has to be staged again.
    pub fn apply_adjustments(&self) -> Result<()> {
        let batch = {
            let state = self.inner.state.lock();
            let levels = match (state.grid(), state.level_set()) {
                (Some(_), Some(levels)) => levels,
                _ => return Err(ContourError::NotReady),
            };
            self.pending.lock().take_changed(state.revision(), levels)
        };

        if batch.is_empty() {
            debug!("No level changes to apply");
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        self.scheduler
            .submit(OperationKind::Adjust, move |progress| inner.adjust(batch, progress))?;
        Ok(())
    }

    pub fn set_visible(&self, index: usize, visible: bool) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.presentation.set_visible(index, visible)?;
        state.sink.request_repaint();
        Ok(())
    }

    pub fn is_visible(&self, index: usize) -> Result<bool> {
        self.inner.state.lock().presentation.is_visible(index)
    }

    /// Recolor every level from a new base color. Geometry is untouched.
    pub fn set_base_color(&self, color: Rgba) {
        let mut state = self.inner.state.lock();
        state.presentation.set_base_color(color);
        state.sink.request_repaint();
    }

    pub fn base_color(&self) -> Rgba {
        self.inner.state.lock().presentation.base_color()
    }

    pub fn colors(&self) -> Vec<Rgba> {
        self.inner.state.lock().presentation.colors().to_vec()
    }

    /// True when nothing is in flight and the last operation succeeded.
    pub fn is_ready(&self) -> bool {
        self.scheduler.is_ready()
    }

    pub async fn wait_ready(&self) -> Result<()> {
        self.scheduler.wait_ready().await
    }

    pub fn progress(&self) -> f32 {
        self.scheduler.progress()
    }

    pub fn status(&self) -> Status {
        self.scheduler.status()
    }

    /// Observe every status transition.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.scheduler.subscribe()
    }

    /// User-facing levels, as requested.
    pub fn levels(&self) -> Vec<f64> {
        self.inner
            .state
            .lock()
            .level_set()
            .map(LevelSet::user_levels)
            .unwrap_or_default()
    }

    /// Levels as handed to the tracer, after block-sum scaling.
    pub fn traced_levels(&self) -> Vec<f64> {
        self.inner
            .state
            .lock()
            .level_set()
            .map(LevelSet::traced_levels)
            .unwrap_or_default()
    }

    pub fn level_count(&self) -> usize {
        self.inner.state.lock().level_set().map_or(0, LevelSet::len)
    }

    /// Traced polylines in working-grid coordinates.
    pub fn contours(&self) -> Vec<Polyline> {
        self.inner.state.lock().contours().to_vec()
    }

    /// Display-space segments of one level.
    pub fn segments(&self, index: usize) -> Vec<Segment> {
        self.inner.state.lock().presentation().segments(index).to_vec()
    }

    pub fn rendered_level_count(&self) -> usize {
        self.inner.state.lock().presentation().level_count()
    }

    pub fn geometry_hash(&self) -> u64 {
        self.inner.state.lock().geometry_hash()
    }

    pub fn has_working_grid(&self) -> bool {
        self.inner.state.lock().grid().is_some()
    }

    pub fn view(&self) -> &Arc<ViewState> {
        &self.inner.view
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn with_sink<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(self.inner.state.lock().sink())
    }

    pub fn with_sink_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.inner.state.lock().sink)
    }

    /// Release every buffer and remove all segments from the sink.
    ///
    /// An operation still in flight is abandoned; its results are discarded.
    pub fn free(&self) {
        let mut state = self.inner.state.lock();
        self.scheduler.supersede();
        self.pending.lock().clear();
        state.clear();
        debug!("Contour overlay freed");
    }
}

/// Builder for [`ContourOverlay`].
pub struct ContourOverlayBuilder<S> {
    source: Arc<dyn SourceImage>,
    view: Arc<ViewState>,
    sink: S,
    config: Option<EngineConfig>,
    tracer: Option<Box<dyn ContourTracer>>,
    base_color: Option<Rgba>,
    runtime: Option<Handle>,
}

impl<S: SegmentSink + 'static> ContourOverlayBuilder<S> {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `tracer` instead of the built-in marching-squares tracer.
    pub fn tracer(mut self, tracer: impl ContourTracer + 'static) -> Self {
        self.tracer = Some(Box::new(tracer));
        self
    }

    pub fn base_color(mut self, color: Rgba) -> Self {
        self.base_color = Some(color);
        self
    }

    /// Take the base color from the owner's allocator.
    pub fn color_from(mut self, allocator: &mut ColorAllocator) -> Self {
        self.base_color = Some(allocator.next_color());
        self
    }

    /// Run background work on `runtime` instead of the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<ContourOverlay<S>> {
        let config = self.config.unwrap_or_default();
        config.validate().map_err(ContourError::InvalidRequest)?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| ContourError::worker_failed(e.to_string()))?,
        };

        let tracer = self.tracer.unwrap_or_else(|| {
            Box::new(MarchingSquaresTracer::with_max_points(config.max_points_per_level))
        });
        let base_color = self
            .base_color
            .or_else(|| config.palette.first().copied())
            .unwrap_or_default();

        Ok(ContourOverlay {
            inner: Arc::new(OverlayInner {
                source: self.source,
                view: self.view,
                sampler: RasterSampler::new(config.max_grid_cells),
                config,
                tracer: Mutex::new(tracer),
                state: Mutex::new(ContourState::new(self.sink, base_color)),
            }),
            pending: Mutex::new(PendingAdjustments::new()),
            scheduler: ComputationScheduler::new(runtime),
        })
    }
}
