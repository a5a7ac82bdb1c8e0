//! Core types and the name sanitizer for sanitizefs.
//!
//! This crate provides the fundamental pieces shared by the scanning and
//! renaming crates: the collected entry list, the pure name transform,
//! configuration and error types.

mod config;
mod entry;
mod error;
mod sanitize;

pub use config::{Partitioning, RenameConfig, RenameConfigBuilder, RenameOptions};
pub use entry::{Entries, Entry, EntryKind, EntryList, MAX_PATH};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use sanitize::{sanitize, sanitize_os};
