//! Isocontour generation and incremental recomputation for astronomical
//! images.
//!
//! The pipeline runs in three steps:
//!
//! - [`RasterSampler`] derives the working grid from the source image
//!   (crop, block-sum downsampling, 2x2 denoising).
//! - [`trace_levels`] runs the tracing collaborator once per level.
//! - [`ContourProjector`] maps traced points to display pixels, through the
//!   sky when the view's projection differs from the source's.
//!
//! [`ContourOverlay`] ties these together with per-level presentation state
//! and runs the work in the background via [`ComputationScheduler`]. Single
//! levels can be re-traced in place without resampling.

pub mod adjust;
pub mod config;
pub mod levels;
pub mod overlay;
pub mod presentation;
pub mod projector;
pub mod sampler;
pub mod scheduler;
pub mod source;
pub mod state;

pub use adjust::{prepare_update, LevelUpdate, PendingAdjustments};
pub use config::EngineConfig;
pub use levels::{
    data_range, generate_levels, levels_by_interval, trace_level, trace_levels, LevelRecord, LevelSet,
};
pub use overlay::{ContourOverlay, ContourOverlayBuilder, ContourRequest};
pub use presentation::{ColorAllocator, PresentationState, RenderedLevel};
pub use projector::ContourProjector;
pub use sampler::{RasterSampler, SamplingParams, WorkingGrid};
pub use scheduler::{ComputationScheduler, OperationKind, Phase, ProgressReporter, Status};
pub use source::{RasterImage, SourceImage, ViewState};
pub use state::ContourState;

pub use contour_common::{ContourError, Result};
