//! Single-active-worker scheduling for full computations and adjustments.
//!
//! At most one operation per overlay is in flight. Its state token (the
//! active operation and a generation number) is only touched under the
//! scheduler's mutex, and every transition is published on a `watch`
//! channel so callers can await readiness instead of polling.

use std::fmt;
use std::sync::Arc;

use contour_common::{ContourError, Result};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

/// The two kinds of work an overlay submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Compute,
    Adjust,
}

/// Step of the operation currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Sampling,
    Tracing,
    Projecting,
    AdjustingLevel,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Sampling => "sampling",
            Phase::Tracing => "tracing",
            Phase::Projecting => "projecting",
            Phase::AdjustingLevel => "adjusting level",
        };
        f.write_str(name)
    }
}

/// Observable scheduler state.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// Nothing computed yet, or freed.
    Idle,
    Running { phase: Phase, progress: f32 },
    /// The last operation succeeded and nothing is in flight.
    Ready,
    Failed(ContourError),
}

impl Status {
    pub fn is_busy(&self) -> bool {
        matches!(self, Status::Running { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Status::Ready)
    }

    /// Overall completion in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        match self {
            Status::Running { progress, .. } => *progress,
            Status::Ready => 1.0,
            Status::Idle | Status::Failed(_) => 0.0,
        }
    }
}

#[derive(Debug, Default)]
struct Token {
    active: Option<OperationKind>,
    generation: u64,
}

struct Shared {
    token: Mutex<Token>,
    status: watch::Sender<Status>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.token.lock().generation == generation
    }

    fn finish(&self, kind: OperationKind, generation: u64, outcome: Result<()>) {
        let mut token = self.token.lock();
        if token.generation != generation {
            debug!(?kind, generation, "Discarding result of superseded operation");
            return;
        }

        token.active = None;
        let status = match outcome {
            Ok(()) => Status::Ready,
            Err(e) => {
                warn!(?kind, error = %e, "Contour operation failed");
                Status::Failed(e)
            }
        };
        self.status.send_replace(status);
    }
}

/// Handed to a running job so it can publish progress and check whether it
/// has been superseded.
pub struct ProgressReporter {
    shared: Arc<Shared>,
    generation: u64,
}

impl ProgressReporter {
    /// Publish progress; ignored once the operation has been superseded.
    pub fn report(&self, phase: Phase, progress: f32) {
        let token = self.shared.token.lock();
        if token.generation == self.generation {
            self.shared.status.send_replace(Status::Running {
                phase,
                progress: progress.clamp(0.0, 1.0),
            });
        }
    }

    /// Whether this operation may still commit its results.
    pub fn is_current(&self) -> bool {
        self.shared.is_current(self.generation)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Runs one operation at a time on the blocking thread pool of `runtime`.
#[derive(Clone)]
pub struct ComputationScheduler {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl ComputationScheduler {
    pub fn new(runtime: Handle) -> Self {
        let (status, _) = watch::channel(Status::Idle);
        Self {
            shared: Arc::new(Shared {
                token: Mutex::new(Token::default()),
                status,
            }),
            runtime,
        }
    }

    /// Start `job` in the background.
    ///
    /// Fails with `Busy` while another operation is in flight. Returns the
    /// generation assigned to the new operation.
    pub fn submit<F>(&self, kind: OperationKind, job: F) -> Result<u64>
    where
        F: FnOnce(&ProgressReporter) -> Result<()> + Send + 'static,
    {
        let generation = {
            let mut token = self.shared.token.lock();
            if let Some(active) = token.active {
                debug!(?kind, ?active, "Rejecting submission while busy");
                return Err(ContourError::Busy);
            }

            token.active = Some(kind);
            token.generation += 1;

            let phase = match kind {
                OperationKind::Compute => Phase::Sampling,
                OperationKind::Adjust => Phase::AdjustingLevel,
            };
            self.shared
                .status
                .send_replace(Status::Running { phase, progress: 0.0 });
            token.generation
        };

        let reporter = ProgressReporter {
            shared: Arc::clone(&self.shared),
            generation,
        };
        let worker = self.runtime.spawn_blocking(move || job(&reporter));

        let shared = Arc::clone(&self.shared);
        self.runtime.spawn(async move {
            let outcome = match worker.await {
                Ok(result) => result,
                Err(e) => Err(ContourError::worker_failed(e.to_string())),
            };
            shared.finish(kind, generation, outcome);
        });

        Ok(generation)
    }

    /// Abandon whatever is in flight.
    ///
    /// The running job keeps going but can no longer commit or report, and
    /// the scheduler accepts new submissions immediately.
    pub fn supersede(&self) {
        let mut token = self.shared.token.lock();
        token.generation += 1;
        token.active = None;
        self.shared.status.send_replace(Status::Idle);
    }

    pub fn status(&self) -> Status {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.shared.status.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.shared.token.lock().active.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.status.borrow().is_ready()
    }

    pub fn progress(&self) -> f32 {
        self.shared.status.borrow().progress()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.shared.is_current(generation)
    }

    /// Wait until nothing is in flight.
    ///
    /// Resolves to the outcome of the last operation, or `NotReady` if
    /// nothing has been computed.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut rx = self.shared.status.subscribe();
        let status = rx
            .wait_for(|s| !s.is_busy())
            .await
            .map_err(|e| ContourError::worker_failed(e.to_string()))?
            .clone();

        match status {
            Status::Ready => Ok(()),
            Status::Failed(e) => Err(e),
            Status::Idle | Status::Running { .. } => Err(ContourError::NotReady),
        }
    }
}

impl fmt::Debug for ComputationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputationScheduler")
            .field("status", &self.status())
            .finish()
    }
}
