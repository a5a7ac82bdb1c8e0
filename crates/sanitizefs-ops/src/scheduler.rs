//! Depth-synchronized rename scheduler.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use sanitizefs_core::{Entries, Entry, Partitioning, RenameOptions};

use crate::barrier::DepthBarrier;
use crate::error::SchedulerError;
use crate::event::{EventSender, RenameEvent, RenameTally};
use crate::partition::{DepthBuckets, static_ranges};
use crate::rename::rename_entry;
use crate::BUCKET_CHUNK_SIZE;

/// Summary of a scheduler run.
#[derive(Debug, Clone, Default)]
pub struct ScheduleReport {
    /// Worker threads used.
    pub workers: usize,
    /// Depth phases run (deepest level + 1).
    pub phases: usize,
    /// Outcome counters across all workers.
    pub tally: RenameTally,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Renames collected entries with a fixed pool of workers, deepest level
/// first.
///
/// For every depth from the deepest down to 0, each worker handles the
/// entries it owns at that depth and then waits at a shared
/// [`DepthBarrier`]. No worker starts depth `d` before every worker is done
/// with depth `d + 1`, so an entry is never resolved through an ancestor
/// that was already renamed.
#[derive(Debug, Clone, Default)]
pub struct RenameScheduler {
    options: RenameOptions,
}

enum WorkPlan {
    Static(Vec<std::ops::Range<usize>>),
    Buckets(DepthBuckets),
}

struct WorkerContext {
    entries: Arc<Entries>,
    barrier: DepthBarrier,
    plan: WorkPlan,
    dry_run: bool,
    events: Option<EventSender>,
}

impl RenameScheduler {
    /// Create a scheduler.
    pub fn new(options: RenameOptions) -> Self {
        Self { options }
    }

    /// Run the rename pass over `entries`.
    ///
    /// Per-entry failures never fail the run; they are reported as skipped
    /// outcomes. An error is only returned when the worker pool itself
    /// breaks down.
    pub fn run(
        &self,
        entries: Arc<Entries>,
        events: Option<EventSender>,
    ) -> Result<ScheduleReport, SchedulerError> {
        let start = Instant::now();
        let workers = self.options.worker_count();
        let phases = entries.phase_count();

        let plan = match self.options.partitioning {
            Partitioning::Static => WorkPlan::Static(static_ranges(entries.len(), workers)),
            Partitioning::DepthBuckets => {
                WorkPlan::Buckets(DepthBuckets::new(&entries, BUCKET_CHUNK_SIZE))
            }
        };

        debug!(
            entries = entries.len(),
            workers,
            phases,
            partitioning = ?self.options.partitioning,
            dry_run = self.options.dry_run,
            "starting rename pass"
        );

        let ctx = Arc::new(WorkerContext {
            entries,
            barrier: DepthBarrier::new(workers),
            plan,
            dry_run: self.options.dry_run,
            events,
        });

        let mut handles: Vec<(usize, JoinHandle<RenameTally>)> = Vec::with_capacity(workers);
        let mut spawn_error = None;

        for id in 0..workers {
            let worker_ctx = Arc::clone(&ctx);
            let spawned = thread::Builder::new()
                .name(format!("sanitize-{id}"))
                .spawn(move || worker_loop(id, &worker_ctx));

            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(source) => {
                    warn!(id, error = %source, "failed to spawn rename worker");
                    ctx.barrier.break_barrier();
                    spawn_error = Some(SchedulerError::Spawn { id, source });
                    break;
                }
            }
        }

        let mut tally = RenameTally::default();
        let mut panicked = None;
        for (id, handle) in handles {
            match handle.join() {
                Ok(worker_tally) => tally.merge(worker_tally),
                Err(_) => {
                    panicked.get_or_insert(SchedulerError::WorkerPanicked { id });
                }
            }
        }

        if let Some(err) = spawn_error.or(panicked) {
            return Err(err);
        }

        let report = ScheduleReport {
            workers,
            phases,
            tally,
            elapsed: start.elapsed(),
        };
        debug!(summary = %report.tally.summary(), elapsed = ?report.elapsed, "rename pass finished");

        Ok(report)
    }
}

/// Breaks the barrier if the worker unwinds, so its peers are not left
/// waiting for an arrival that will never come.
struct BreakOnPanic<'a>(&'a DepthBarrier);

impl Drop for BreakOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.break_barrier();
        }
    }
}

fn worker_loop(id: usize, ctx: &WorkerContext) -> RenameTally {
    let _guard = BreakOnPanic(&ctx.barrier);
    let mut tally = RenameTally::default();
    let entries = ctx.entries.as_slice();

    for depth in ctx.entries.depths_descending() {
        match &ctx.plan {
            WorkPlan::Static(ranges) => {
                for idx in ranges[id].clone() {
                    if entries[idx].depth == depth {
                        process(ctx, idx, &entries[idx], &mut tally);
                    }
                }
            }
            WorkPlan::Buckets(buckets) => {
                while let Some(chunk) = buckets.claim(depth) {
                    for &idx in chunk {
                        process(ctx, idx, &entries[idx], &mut tally);
                    }
                }
            }
        }

        if ctx.barrier.arrive().is_broken() {
            debug!(id, depth, "barrier broken, stopping worker");
            break;
        }
        trace!(id, depth, "depth finished");
    }

    tally
}

fn process(ctx: &WorkerContext, index: usize, entry: &Entry, tally: &mut RenameTally) {
    let attempt = rename_entry(entry, ctx.dry_run);
    tally.record(attempt.outcome);

    if let Some(events) = &ctx.events {
        let _ = events.send(RenameEvent {
            path: entry.path.clone(),
            new_name: attempt.new_name,
            depth: Some(entry.depth),
            index,
            outcome: attempt.outcome,
            finished_at: Instant::now(),
        });
    }
}
