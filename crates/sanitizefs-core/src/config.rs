//! Run configuration types.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// How entries are handed out to rename workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Partitioning {
    /// Each worker owns one contiguous index range, reused for every depth.
    #[default]
    Static,
    /// Entries are bucketed per depth and workers pull chunks of the
    /// current bucket from a shared cursor.
    DepthBuckets,
}

/// Configuration for one sanitizing run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct RenameConfig {
    /// Paths given by the user. Directories are traversed; every root is
    /// also renamed itself at the end of the run.
    pub roots: Vec<PathBuf>,

    /// Report planned renames without touching the filesystem.
    #[builder(default = "false")]
    #[serde(default)]
    pub dry_run: bool,

    /// Number of rename workers (0 = one per available CPU).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Work distribution strategy.
    #[builder(default)]
    #[serde(default)]
    pub partitioning: Partitioning,
}

impl RenameConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.roots {
            Some(ref roots) if roots.is_empty() => Err("At least one root is required".to_string()),
            Some(ref roots) if roots.iter().any(|r| r.as_os_str().is_empty()) => {
                Err("Root path cannot be empty".to_string())
            }
            Some(_) => Ok(()),
            None => Err("Root paths are required".to_string()),
        }
    }
}

impl RenameConfig {
    /// Create a new config builder.
    pub fn builder() -> RenameConfigBuilder {
        RenameConfigBuilder::default()
    }

    /// Options consumed by the rename scheduler.
    pub fn rename_options(&self) -> RenameOptions {
        RenameOptions {
            dry_run: self.dry_run,
            workers: self.workers,
            partitioning: self.partitioning,
        }
    }
}

/// Options for the rename pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenameOptions {
    /// Report planned renames without touching the filesystem.
    pub dry_run: bool,
    /// Requested worker count (0 = auto).
    pub workers: usize,
    /// Work distribution strategy.
    pub partitioning: Partitioning,
}

impl RenameOptions {
    /// Effective worker count, at least 1.
    pub fn worker_count(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            n => n,
        }
    }
}
