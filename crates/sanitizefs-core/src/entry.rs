//! Collected entries and the shared entry list.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Longest path (in bytes) the collector will record.
pub const MAX_PATH: usize = 4096;

/// Kind of a collected entry, as seen at collection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// One filesystem object discovered below a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Path as it existed when the entry was discovered.
    pub path: PathBuf,
    /// Directory levels below the root; the root's direct children are 0.
    pub depth: usize,
    /// Kind observed during collection.
    pub kind: EntryKind,
}

impl Entry {
    /// Create a new entry.
    pub fn new(path: impl Into<PathBuf>, depth: usize, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            depth,
            kind,
        }
    }

    /// Final path component.
    pub fn file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }

    /// Directory containing this entry.
    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }
}

#[derive(Debug, Default)]
struct EntryListInner {
    entries: Vec<Entry>,
    max_depth: Option<usize>,
}

/// Append-only entry list filled during collection.
///
/// Appends are serialized through a mutex so several collectors may feed
/// the same list. Once collection is over the list is frozen into an
/// immutable [`Entries`] snapshot for the rename workers.
#[derive(Debug, Default)]
pub struct EntryList {
    inner: Mutex<EntryListInner>,
}

impl EntryList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, updating the maximum depth.
    pub fn push(&self, entry: Entry) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.max_depth = Some(inner.max_depth.map_or(entry.depth, |d| d.max(entry.depth)));
        inner.entries.push(entry);
    }

    /// Number of entries recorded so far.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deepest depth recorded so far.
    pub fn max_depth(&self) -> Option<usize> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .max_depth
    }

    /// Finish collection and produce the read-only snapshot.
    pub fn freeze(self) -> Entries {
        let inner = self
            .inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        Entries {
            entries: inner.entries,
            max_depth: inner.max_depth,
        }
    }
}

/// Immutable, insertion-ordered snapshot of collected entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entries {
    entries: Vec<Entry>,
    max_depth: Option<usize>,
}

impl Entries {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deepest recorded depth, `None` when empty.
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Depth levels from the deepest down to 0.
    pub fn depths_descending(&self) -> impl Iterator<Item = usize> {
        self.max_depth.into_iter().flat_map(|max| (0..=max).rev())
    }

    /// Number of depth phases a rename pass needs.
    pub fn phase_count(&self) -> usize {
        self.max_depth.map_or(0, |max| max + 1)
    }

    /// Entries as a slice, in discovery order.
    pub fn as_slice(&self) -> &[Entry] {
        &self.entries
    }

    /// Iterate over entries in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

impl From<Vec<Entry>> for Entries {
    fn from(entries: Vec<Entry>) -> Self {
        let max_depth = entries.iter().map(|e| e.depth).max();
        Self { entries, max_depth }
    }
}

impl<'a> IntoIterator for &'a Entries {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_tracks_max_depth() {
        let list = EntryList::new();
        assert_eq!(list.max_depth(), None);

        list.push(Entry::new("/r/a", 0, EntryKind::Directory));
        list.push(Entry::new("/r/a/b/c", 2, EntryKind::File));
        list.push(Entry::new("/r/a/b", 1, EntryKind::Directory));

        assert_eq!(list.len(), 3);
        assert_eq!(list.max_depth(), Some(2));
    }

    #[test]
    fn test_freeze_keeps_order() {
        let list = EntryList::new();
        list.push(Entry::new("/r/x", 0, EntryKind::File));
        list.push(Entry::new("/r/y", 0, EntryKind::File));

        let entries = list.freeze();
        let paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/r/x"), PathBuf::from("/r/y")]);
    }

    #[test]
    fn test_depths_descending() {
        let entries = Entries::from(vec![
            Entry::new("/r/a", 0, EntryKind::Directory),
            Entry::new("/r/a/b", 1, EntryKind::Directory),
            Entry::new("/r/a/b/c", 2, EntryKind::File),
        ]);

        assert_eq!(entries.depths_descending().collect::<Vec<_>>(), vec![2, 1, 0]);
        assert_eq!(entries.phase_count(), 3);
        assert_eq!(entries.iter().filter(|e| e.depth == 1).count(), 1);
    }

    #[test]
    fn test_empty_has_no_phases() {
        let entries = EntryList::new().freeze();
        assert!(entries.is_empty());
        assert_eq!(entries.depths_descending().count(), 0);
        assert_eq!(entries.phase_count(), 0);
    }

    #[test]
    fn test_concurrent_push() {
        let list = EntryList::new();
        std::thread::scope(|s| {
            for t in 0..4 {
                let list = &list;
                s.spawn(move || {
                    for i in 0..100 {
                        list.push(Entry::new(format!("/r/{t}/{i}"), t, EntryKind::File));
                    }
                });
            }
        });

        assert_eq!(list.len(), 400);
        assert_eq!(list.max_depth(), Some(3));
    }
}
