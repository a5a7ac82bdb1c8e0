//! Name sanitization.
//!
//! Maps an arbitrary entry name onto the portable alphabet `[a-z0-9_]`,
//! optionally keeping the extension (everything from the last `.`) as-is.

use std::ffi::OsStr;

/// Sanitize a single path component.
///
/// When `preserve_extension` is set, the suffix starting at the last `.`
/// is copied verbatim, case included. The rest of the name is lowercased,
/// separators (`_`, space, `-`, `.`) collapse into a single `_`, and every
/// other character is dropped. A trailing `_` before the extension and a
/// single leading `_` are removed.
///
/// ```
/// use sanitizefs_core::sanitize;
///
/// assert_eq!(sanitize("MY DIR", false), "my_dir");
/// assert_eq!(sanitize("FILE NAME.TXT", true), "file_name.TXT");
/// assert_eq!(sanitize("--weird__name--.mp4", true), "weird_name.mp4");
/// ```
pub fn sanitize(name: &str, preserve_extension: bool) -> String {
    let split = if preserve_extension { name.rfind('.') } else { None };
    let (stem, extension) = match split {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    };

    let mut out = String::with_capacity(name.len());
    for c in stem.chars() {
        match c {
            'A'..='Z' => out.push(c.to_ascii_lowercase()),
            'a'..='z' | '0'..='9' => out.push(c),
            '_' | ' ' | '-' | '.' => {
                if !out.ends_with('_') {
                    out.push('_');
                }
            }
            _ => {}
        }
    }

    if out.ends_with('_') {
        out.pop();
    }

    out.push_str(extension);

    if out.starts_with('_') {
        out.remove(0);
    }

    out
}

/// Sanitize a raw file name as read from the filesystem.
///
/// Bytes that are not valid UTF-8 are dropped like any other disallowed
/// character. Returns `None` when nothing usable is left, since an empty
/// string can never be a rename target.
pub fn sanitize_os(name: &OsStr, preserve_extension: bool) -> Option<String> {
    let sanitized = match name.to_str() {
        Some(name) => sanitize(name, preserve_extension),
        None => sanitize(&name.to_string_lossy(), preserve_extension),
    };

    (!sanitized.is_empty()).then_some(sanitized)
}
