//! Depth-synchronized rename engine for sanitizefs.
//!
//! Collected entries are renamed by a fixed pool of worker threads, one
//! depth level at a time from the deepest up. A [`DepthBarrier`] keeps any
//! worker from starting a shallower level while another is still busy with
//! a deeper one, so every recorded path still resolves when its turn comes.
//! The roots themselves are renamed afterwards by the [`RootFinalizer`].

mod barrier;
mod error;
mod event;
mod finalizer;
mod partition;
mod rename;
mod scheduler;

pub use barrier::{BarrierWaitResult, DepthBarrier};
pub use error::SchedulerError;
pub use event::{
    EventSender, RenameEvent, RenameOutcome, RenameTally, SkipReason, sort_events,
};
pub use finalizer::RootFinalizer;
pub use partition::{DepthBuckets, static_ranges};
pub use rename::{RenameAttempt, rename_entry};
pub use scheduler::{RenameScheduler, ScheduleReport};

pub use sanitizefs_core::{Partitioning, RenameOptions};

/// Number of bucket positions a worker claims at once in
/// [`Partitioning::DepthBuckets`] mode.
pub const BUCKET_CHUNK_SIZE: usize = 64;
