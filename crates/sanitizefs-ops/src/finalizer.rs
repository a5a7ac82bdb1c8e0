//! Renaming of the roots themselves.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, warn};

use crate::event::{EventSender, RenameEvent, RenameTally};
use crate::rename::rename_path;

/// Sanitizes the base names of the roots after their contents are done.
///
/// Roots are resolved to absolute paths first. Roots whose base name is
/// hidden, or that cannot be resolved, are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootFinalizer {
    dry_run: bool,
}

impl RootFinalizer {
    /// Create a finalizer.
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Rename every root in order.
    pub fn finalize(&self, roots: &[PathBuf], events: Option<&EventSender>) -> RenameTally {
        let mut tally = RenameTally::default();

        for (index, root) in roots.iter().enumerate() {
            let Some(event) = self.finalize_root(index, root) else {
                continue;
            };
            tally.record(event.outcome);
            if let Some(events) = events {
                let _ = events.send(event);
            }
        }

        debug!(summary = %tally.summary(), "roots finalized");
        tally
    }

    fn finalize_root(&self, index: usize, root: &Path) -> Option<RenameEvent> {
        let resolved = match std::fs::canonicalize(root) {
            Ok(path) => path,
            Err(err) => {
                warn!(root = %root.display(), %err, "cannot resolve root");
                return None;
            }
        };

        let name = resolved.file_name()?;
        if name.as_encoded_bytes().starts_with(b".") {
            debug!(root = %resolved.display(), "hidden root left alone");
            return None;
        }

        let metadata = match std::fs::symlink_metadata(&resolved) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(root = %resolved.display(), %err, "cannot query root");
                return None;
            }
        };

        let attempt = rename_path(&resolved, metadata.is_file(), self.dry_run);
        Some(RenameEvent {
            path: resolved,
            new_name: attempt.new_name,
            depth: None,
            index,
            outcome: attempt.outcome,
            finished_at: Instant::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RenameOutcome;
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    #[test]
    fn test_root_renamed_by_base_name() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("My Photos");
        fs::create_dir(&root).unwrap();

        let tally = RootFinalizer::new(false).finalize(&[root.clone()], None);

        assert_eq!(tally.renamed, 1);
        assert!(!root.exists());
        assert!(temp.path().join("my_photos").is_dir());
    }

    #[test]
    fn test_hidden_root_untouched() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".Hidden Root");
        fs::create_dir(&root).unwrap();

        let tally = RootFinalizer::new(false).finalize(&[root.clone()], None);

        assert_eq!(tally.total(), 0);
        assert!(root.is_dir());
    }

    #[test]
    fn test_missing_root_skipped() {
        let temp = TempDir::new().unwrap();
        let tally = RootFinalizer::new(false).finalize(&[temp.path().join("Nope")], None);
        assert_eq!(tally.total(), 0);
    }

    #[test]
    fn test_dry_run_reports_absolute_path() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Big Dir");
        fs::create_dir(&root).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let tally = RootFinalizer::new(true).finalize(&[root.clone()], Some(&tx));

        assert_eq!(tally.planned, 1);
        assert!(root.is_dir());

        let event = rx.try_recv().unwrap();
        assert_eq!(event.outcome, RenameOutcome::Planned);
        assert_eq!(event.depth, None);
        assert!(event.path.is_absolute());
        assert_eq!(
            event.notice().unwrap(),
            format!("\"{}\" --> \"big_dir\"", fs::canonicalize(&root).unwrap().display())
        );
    }
}
