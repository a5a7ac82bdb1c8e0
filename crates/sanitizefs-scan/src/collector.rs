//! JWalk-based depth-first tree collector.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Instant;

use jwalk::{Parallelism, WalkDir};
use tracing::{debug, trace};

use sanitizefs_core::{
    Entry, EntryKind, EntryList, MAX_PATH, ScanError, ScanWarning, WarningKind,
};

use crate::stats::CollectStats;

/// Collects every visible file and directory below a root.
///
/// The walk is pre-order: a directory is recorded before its contents.
/// It runs serially so discovery order is the directory read order, which
/// decides which of two colliding siblings gets renamed first.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeCollector;

impl TreeCollector {
    /// Create a new collector.
    pub fn new() -> Self {
        Self
    }

    /// Walk `root` and append its entries to `entries`.
    ///
    /// The root itself is not recorded; its direct children are depth 0.
    pub fn collect(
        &self,
        root: impl AsRef<Path>,
        entries: &EntryList,
    ) -> Result<CollectStats, ScanError> {
        let root = root.as_ref();
        let start = Instant::now();

        let metadata = std::fs::symlink_metadata(root).map_err(|e| ScanError::io(root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .sort(false)
            .min_depth(1)
            .process_read_dir(|_depth, _path, _state, children| {
                // jwalk's own hidden check gives up on non-UTF-8 names, so
                // filter on the raw bytes. Dropped directories are not read.
                children.retain(|child| {
                    child
                        .as_ref()
                        .map_or(true, |e| !is_hidden(&e.file_name))
                });
            });

        let mut stats = CollectStats::new();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    debug!(path = %path.display(), error = %err, "skipping unreadable entry");
                    let warning = match err.io_error() {
                        Some(io) => ScanWarning::read_error(path, io),
                        None => ScanWarning::new(path, err.to_string(), WarningKind::ReadError),
                    };
                    stats.warnings.push(warning);
                    continue;
                }
            };

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                stats.ignored += 1;
                continue;
            };

            let path = entry.path();
            if path.as_os_str().len() > MAX_PATH {
                debug!(path = %path.display(), "path too long, not recorded");
                stats.warnings.push(ScanWarning::path_too_long(path));
                continue;
            }

            let depth = entry.depth() - 1;
            trace!(path = %path.display(), depth, "collected");
            stats.record(depth, kind == EntryKind::Directory);
            entries.push(Entry::new(path, depth, kind));
        }

        stats.duration = start.elapsed();
        debug!(
            root = %root.display(),
            files = stats.files,
            dirs = stats.dirs,
            warnings = stats.warnings.len(),
            "collection finished"
        );

        Ok(stats)
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().starts_with(b".")
}
