//! Per-entry rename.
//!
//! The parent directory is opened fresh for every entry and the entry is
//! queried and renamed relative to that handle, never following symlinks
//! and never replacing an existing name.

use std::ffi::OsStr;
use std::os::fd::AsFd;
use std::path::Path;

use compact_str::CompactString;
use rustix::fs::{AtFlags, CWD, FileType, Mode, OFlags};
use rustix::io::Errno;
use tracing::trace;

use sanitizefs_core::{Entry, sanitize_os};

use crate::event::{RenameOutcome, SkipReason};

/// Result of processing one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameAttempt {
    /// Sanitized name, if one could be computed.
    pub new_name: Option<CompactString>,
    /// What happened.
    pub outcome: RenameOutcome,
}

impl RenameAttempt {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            new_name: None,
            outcome: RenameOutcome::Skipped(reason),
        }
    }
}

#[cfg(target_os = "linux")]
const PARENT_FLAGS: OFlags = OFlags::PATH.union(OFlags::DIRECTORY).union(OFlags::CLOEXEC);
#[cfg(not(target_os = "linux"))]
const PARENT_FLAGS: OFlags = OFlags::RDONLY.union(OFlags::DIRECTORY).union(OFlags::CLOEXEC);

/// Sanitize the name of a collected entry in place.
///
/// Opens the parent by path, queries the entry through that handle and,
/// unless `dry_run` is set, renames it to its sanitized name inside the
/// same directory. Every failure skips the entry.
pub fn rename_entry(entry: &Entry, dry_run: bool) -> RenameAttempt {
    let (Some(parent), Some(name)) = (entry.parent(), entry.file_name()) else {
        return RenameAttempt::skipped(SkipReason::InvalidPath);
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    let dir = match rustix::fs::openat(CWD, parent, PARENT_FLAGS, Mode::empty()) {
        Ok(fd) => fd,
        Err(err) => {
            trace!(path = %entry.path.display(), %err, "parent unavailable");
            return RenameAttempt::skipped(SkipReason::ParentUnavailable);
        }
    };

    let stat = match rustix::fs::statat(&dir, name, AtFlags::SYMLINK_NOFOLLOW) {
        Ok(stat) => stat,
        Err(err) => {
            trace!(path = %entry.path.display(), %err, "stat failed");
            return RenameAttempt::skipped(SkipReason::StatFailed);
        }
    };
    let is_file = FileType::from_raw_mode(stat.st_mode as _) == FileType::RegularFile;

    let name = Path::new(name);
    apply(&entry.path, name, is_file, dry_run, |new_name| {
        rename_noreplace(&dir, name, &dir, Path::new(new_name))
    })
}

/// Rename `path` to its sanitized name, resolved from the current working
/// directory instead of through a parent handle. The target stays in the
/// same parent directory.
pub(crate) fn rename_path(path: &Path, is_file: bool, dry_run: bool) -> RenameAttempt {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return RenameAttempt::skipped(SkipReason::InvalidPath);
    };

    apply(path, Path::new(name), is_file, dry_run, |new_name| {
        rename_noreplace(CWD, path, CWD, &parent.join(new_name))
    })
}

fn apply<F>(path: &Path, name: &Path, is_file: bool, dry_run: bool, rename: F) -> RenameAttempt
where
    F: FnOnce(&str) -> Result<(), Errno>,
{
    let Some(new_name) = sanitize_os(name.as_os_str(), is_file) else {
        return RenameAttempt::skipped(SkipReason::EmptyName);
    };
    let new_name = CompactString::from(new_name);

    let outcome = if name.as_os_str() == OsStr::new(new_name.as_str()) {
        RenameOutcome::Unchanged
    } else if dry_run {
        RenameOutcome::Planned
    } else {
        match rename(new_name.as_str()) {
            Ok(()) => RenameOutcome::Renamed,
            Err(Errno::EXIST) => {
                trace!(path = %path.display(), target = %new_name, "target exists");
                RenameOutcome::Skipped(SkipReason::TargetExists)
            }
            Err(err) => {
                trace!(path = %path.display(), target = %new_name, %err, "rename failed");
                RenameOutcome::Skipped(SkipReason::RenameFailed)
            }
        }
    };

    RenameAttempt {
        new_name: Some(new_name),
        outcome,
    }
}

/// Rename without replacing an existing entry.
///
/// Falls back to check-then-rename on filesystems that reject
/// `RENAME_NOREPLACE`.
#[cfg(target_os = "linux")]
fn rename_noreplace<Fd: AsFd>(
    old_dir: Fd,
    old: &Path,
    new_dir: Fd,
    new: &Path,
) -> Result<(), Errno> {
    use rustix::fs::RenameFlags;

    match rustix::fs::renameat_with(&old_dir, old, &new_dir, new, RenameFlags::NOREPLACE) {
        Err(Errno::INVAL) | Err(Errno::NOSYS) => rename_checked(old_dir, old, new_dir, new),
        result => result,
    }
}

#[cfg(not(target_os = "linux"))]
fn rename_noreplace<Fd: AsFd>(
    old_dir: Fd,
    old: &Path,
    new_dir: Fd,
    new: &Path,
) -> Result<(), Errno> {
    rename_checked(old_dir, old, new_dir, new)
}

fn rename_checked<Fd: AsFd>(old_dir: Fd, old: &Path, new_dir: Fd, new: &Path) -> Result<(), Errno> {
    match rustix::fs::statat(&new_dir, new, AtFlags::SYMLINK_NOFOLLOW) {
        Ok(_) => Err(Errno::EXIST),
        Err(Errno::NOENT) => rustix::fs::renameat(&old_dir, old, &new_dir, new),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanitizefs_core::EntryKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_rename_file_keeps_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("FILE NAME.TXT");
        fs::write(&path, "x").unwrap();

        let attempt = rename_entry(&Entry::new(&path, 0, EntryKind::File), false);

        assert_eq!(attempt.outcome, RenameOutcome::Renamed);
        assert_eq!(attempt.new_name.as_deref(), Some("file_name.TXT"));
        assert!(temp.path().join("file_name.TXT").exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_directory_dots_are_separators() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Old.Photos");
        fs::create_dir(&path).unwrap();

        let attempt = rename_entry(&Entry::new(&path, 0, EntryKind::Directory), false);

        assert_eq!(attempt.outcome, RenameOutcome::Renamed);
        assert!(temp.path().join("old_photos").is_dir());
    }

    #[test]
    fn test_clean_name_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clean.txt");
        fs::write(&path, "x").unwrap();

        let attempt = rename_entry(&Entry::new(&path, 0, EntryKind::File), false);
        assert_eq!(attempt.outcome, RenameOutcome::Unchanged);
        assert!(path.exists());
    }

    #[test]
    fn test_existing_target_not_replaced() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("A B.txt");
        let target = temp.path().join("a_b.txt");
        fs::write(&source, "source").unwrap();
        fs::write(&target, "target").unwrap();

        let attempt = rename_entry(&Entry::new(&source, 0, EntryKind::File), false);

        assert_eq!(attempt.outcome, RenameOutcome::Skipped(SkipReason::TargetExists));
        assert_eq!(fs::read_to_string(&source).unwrap(), "source");
        assert_eq!(fs::read_to_string(&target).unwrap(), "target");
    }

    #[test]
    fn test_dry_run_plans_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("MY DIR");
        fs::create_dir(&path).unwrap();

        let attempt = rename_entry(&Entry::new(&path, 0, EntryKind::Directory), true);

        assert_eq!(attempt.outcome, RenameOutcome::Planned);
        assert_eq!(attempt.new_name.as_deref(), Some("my_dir"));
        assert!(path.is_dir());
        assert!(!temp.path().join("my_dir").exists());
    }

    #[test]
    fn test_missing_parent_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone/File.txt");

        let attempt = rename_entry(&Entry::new(&path, 1, EntryKind::File), false);
        assert_eq!(attempt.outcome, RenameOutcome::Skipped(SkipReason::ParentUnavailable));
    }

    #[test]
    fn test_missing_entry_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Vanished.txt");

        let attempt = rename_entry(&Entry::new(&path, 0, EntryKind::File), false);
        assert_eq!(attempt.outcome, RenameOutcome::Skipped(SkipReason::StatFailed));
    }

    #[test]
    fn test_empty_sanitized_name_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("###");
        fs::create_dir(&path).unwrap();

        let attempt = rename_entry(&Entry::new(&path, 0, EntryKind::Directory), false);
        assert_eq!(attempt.outcome, RenameOutcome::Skipped(SkipReason::EmptyName));
        assert!(path.is_dir());
    }

    #[test]
    fn test_rename_path_absolute() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Some File.MP4");
        fs::write(&path, "x").unwrap();

        let attempt = rename_path(&path, true, false);
        assert_eq!(attempt.outcome, RenameOutcome::Renamed);
        assert!(temp.path().join("some_file.MP4").exists());
    }
}
