//! Scheduler errors.

use thiserror::Error;

/// Failures of the worker pool itself.
///
/// Per-entry problems are never errors; they show up as
/// [`SkipReason`](crate::SkipReason)s instead.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A worker thread could not be started.
    #[error("Failed to spawn rename worker {id}: {source}")]
    Spawn {
        id: usize,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("Rename worker {id} panicked")]
    WorkerPanicked { id: usize },
}
