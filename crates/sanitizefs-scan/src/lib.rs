//! Tree collection for sanitizefs.
//!
//! `sanitizefs-scan` walks each root depth-first with jwalk and records
//! every visible file and directory, with its depth, into a shared
//! [`EntryList`]. Hidden entries (names starting with `.`) are neither
//! recorded nor descended into, and symlinks are never followed.
//!
//! # Example
//!
//! ```rust,no_run
//! use sanitizefs_scan::{EntryList, TreeCollector};
//!
//! let entries = EntryList::new();
//! let collector = TreeCollector::new();
//! let stats = collector.collect("/path/to/tree", &entries).unwrap();
//!
//! println!("{} files, {} directories", stats.files, stats.dirs);
//! let snapshot = entries.freeze();
//! println!("deepest level: {:?}", snapshot.max_depth());
//! ```

mod collector;
mod stats;

pub use collector::TreeCollector;
pub use stats::CollectStats;

// Re-export core types for convenience
pub use sanitizefs_core::{Entries, Entry, EntryKind, EntryList, ScanError, ScanWarning, WarningKind};
