//! Error types for contour computation.

use thiserror::Error;

/// Result type alias using ContourError.
pub type Result<T> = std::result::Result<T, ContourError>;

/// Errors surfaced by a full computation or an adjustment.
///
/// `Clone` so the outcome of a background operation can be published to
/// every observer of the readiness channel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContourError {
    #[error(
        "not enough memory while {stage} ({requested} elements requested); \
         try a smaller region, a larger smoothing factor or fewer levels"
    )]
    ResourceExhausted { stage: String, requested: usize },

    #[error("no source image available")]
    NoSourceImage,

    #[error("contours have not been computed yet")]
    NotReady,

    #[error("a contour computation is already in progress")]
    Busy,

    #[error("too many contour levels: {requested} requested, at most {max} allowed")]
    TooManyLevels { requested: usize, max: usize },

    #[error("contour level index {index} out of range for {len} levels")]
    LevelOutOfRange { index: usize, len: usize },

    #[error("invalid contour request: {0}")]
    InvalidRequest(String),

    #[error("contour worker failed: {0}")]
    WorkerFailed(String),
}

impl ContourError {
    /// Create a ResourceExhausted error.
    pub fn resource_exhausted(stage: impl Into<String>, requested: usize) -> Self {
        Self::ResourceExhausted {
            stage: stage.into(),
            requested,
        }
    }

    /// Create an InvalidRequest error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a WorkerFailed error.
    pub fn worker_failed(msg: impl Into<String>) -> Self {
        Self::WorkerFailed(msg.into())
    }

    /// Whether retrying with a smaller workload could succeed.
    pub fn is_resource_error(&self) -> bool {
        matches!(self, ContourError::ResourceExhausted { .. })
    }
}

/// Errors reported by a tracing collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraceError {
    #[error("tracer ran out of memory ({requested} points requested)")]
    OutOfMemory { requested: usize },

    #[error("tracer has no grid")]
    NoGrid,

    #[error("invalid grid: {0}")]
    InvalidGrid(String),
}

impl From<TraceError> for ContourError {
    fn from(err: TraceError) -> Self {
        match err {
            TraceError::OutOfMemory { requested } => {
                ContourError::resource_exhausted("tracing contours", requested)
            }
            TraceError::NoGrid => ContourError::NotReady,
            TraceError::InvalidGrid(msg) => ContourError::InvalidRequest(msg),
        }
    }
}

impl From<std::collections::TryReserveError> for ContourError {
    fn from(_: std::collections::TryReserveError) -> Self {
        ContourError::resource_exhausted("allocating buffers", 0)
    }
}

impl From<serde_json::Error> for ContourError {
    fn from(err: serde_json::Error) -> Self {
        ContourError::InvalidRequest(format!("JSON error: {}", err))
    }
}
