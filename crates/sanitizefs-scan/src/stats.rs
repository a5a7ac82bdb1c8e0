//! Collection statistics.

use std::time::Duration;

use sanitizefs_core::ScanWarning;

/// Summary of one collection pass.
#[derive(Debug, Clone, Default)]
pub struct CollectStats {
    /// Regular files recorded.
    pub files: u64,
    /// Directories recorded.
    pub dirs: u64,
    /// Entries of other kinds (symlinks, devices, ...) that were passed over.
    pub ignored: u64,
    /// Deepest depth recorded, `None` if nothing was recorded.
    pub max_depth: Option<usize>,
    /// Non-fatal problems.
    pub warnings: Vec<ScanWarning>,
    /// Time spent walking.
    pub duration: Duration,
}

impl CollectStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entries recorded.
    pub fn recorded(&self) -> u64 {
        self.files + self.dirs
    }

    pub(crate) fn record(&mut self, depth: usize, is_dir: bool) {
        if is_dir {
            self.dirs += 1;
        } else {
            self.files += 1;
        }
        self.max_depth = Some(self.max_depth.map_or(depth, |d| d.max(depth)));
    }

    /// Fold another pass into this one.
    pub fn merge(&mut self, other: CollectStats) {
        self.files += other.files;
        self.dirs += other.dirs;
        self.ignored += other.ignored;
        self.max_depth = match (self.max_depth, other.max_depth) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.warnings.extend(other.warnings);
        self.duration += other.duration;
    }
}
