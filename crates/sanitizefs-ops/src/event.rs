//! Rename events and outcome accounting.

use std::cmp::Reverse;
use std::path::PathBuf;
use std::time::Instant;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Channel end handed to workers for reporting events.
///
/// Unbounded so plain threads can send without blocking or a runtime.
pub type EventSender = mpsc::UnboundedSender<RenameEvent>;

/// Why an entry was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The path has no parent or no final component.
    InvalidPath,
    /// The parent directory could not be opened.
    ParentUnavailable,
    /// The entry could not be queried.
    StatFailed,
    /// Nothing usable is left after sanitizing.
    EmptyName,
    /// An entry with the sanitized name already exists.
    TargetExists,
    /// The rename call failed for another reason.
    RenameFailed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath => write!(f, "Invalid path"),
            Self::ParentUnavailable => write!(f, "Parent directory unavailable"),
            Self::StatFailed => write!(f, "Could not query entry"),
            Self::EmptyName => write!(f, "Sanitized name is empty"),
            Self::TargetExists => write!(f, "Target already exists"),
            Self::RenameFailed => write!(f, "Rename failed"),
        }
    }
}

/// What happened to a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenameOutcome {
    /// The entry was renamed.
    Renamed,
    /// Dry run: the entry would be renamed.
    Planned,
    /// The name is already clean.
    Unchanged,
    /// The entry was skipped.
    Skipped(SkipReason),
}

impl RenameOutcome {
    /// Check if the name changed (or would change in a dry run).
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Renamed | Self::Planned)
    }
}

/// Report for one processed entry or root.
#[derive(Debug, Clone)]
pub struct RenameEvent {
    /// Path as recorded (entries) or resolved (roots).
    pub path: PathBuf,
    /// Sanitized name, if one could be computed.
    pub new_name: Option<CompactString>,
    /// Depth of the entry, `None` for roots.
    pub depth: Option<usize>,
    /// Position in the entry snapshot, or in the root list for roots.
    pub index: usize,
    /// Outcome.
    pub outcome: RenameOutcome,
    /// When processing of the entry finished.
    pub finished_at: Instant,
}

impl RenameEvent {
    /// The `"old" --> "new"` line for a planned rename.
    pub fn notice(&self) -> Option<String> {
        match (&self.outcome, &self.new_name) {
            (RenameOutcome::Planned, Some(new_name)) => {
                Some(format!("\"{}\" --> \"{}\"", self.path.display(), new_name))
            }
            _ => None,
        }
    }
}

/// Put events in report order: deepest level first, discovery order
/// within a level, then the roots in argument order.
///
/// Workers finish entries of the same level in no fixed order, so output
/// built from events must be sorted to be reproducible.
pub fn sort_events(events: &mut [RenameEvent]) {
    events.sort_by_key(|e| (e.depth.is_none(), Reverse(e.depth), e.index));
}

/// Outcome counters for a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameTally {
    /// Entries renamed.
    pub renamed: usize,
    /// Entries that would be renamed (dry run).
    pub planned: usize,
    /// Entries whose name was already clean.
    pub unchanged: usize,
    /// Entries skipped.
    pub skipped: usize,
}

impl RenameTally {
    /// Count one outcome.
    pub fn record(&mut self, outcome: RenameOutcome) {
        match outcome {
            RenameOutcome::Renamed => self.renamed += 1,
            RenameOutcome::Planned => self.planned += 1,
            RenameOutcome::Unchanged => self.unchanged += 1,
            RenameOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    /// Add another tally to this one.
    pub fn merge(&mut self, other: RenameTally) {
        self.renamed += other.renamed;
        self.planned += other.planned;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }

    /// Total entries accounted for.
    pub fn total(&self) -> usize {
        self.renamed + self.planned + self.unchanged + self.skipped
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.planned > 0 {
            format!(
                "{} to rename, {} unchanged, {} skipped",
                self.planned, self.unchanged, self.skipped
            )
        } else {
            format!(
                "Renamed {} items, {} unchanged, {} skipped",
                self.renamed, self.unchanged, self.skipped
            )
        }
    }
}
