//! Path helpers for module ids and emitted file names.
//!
//! Module ids coming from a bundler always use forward slashes, while paths
//! read from configuration may not. Everything is compared in posix form.

use std::path::Path;

/// Convert backslashes to forward slashes.
#[inline]
pub fn to_posix(path: &str) -> String {
    path.replace('\\', "/")
}

/// Posix form of a filesystem path.
pub fn path_to_posix(path: &Path) -> String {
    to_posix(&path.to_string_lossy())
}

/// Join posix segments, collapsing duplicate separators.
///
/// Empty segments are skipped, so `posix_join(["", "a.css"])` is `"a.css"`.
pub fn posix_join<'a, I>(segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for segment in segments {
        let segment = to_posix(segment);
        if segment.is_empty() {
            continue;
        }
        if out.is_empty() {
            out.push_str(&segment);
        } else {
            if !out.ends_with('/') {
                out.push('/');
            }
            out.push_str(segment.trim_start_matches('/'));
        }
    }
    out
}

/// Strip leading slashes so a path can be emitted relative to the output root.
#[inline]
pub fn strip_leading_slashes(path: &str) -> &str {
    path.trim_start_matches(['/', '\\'])
}

/// Strip the `?query` suffix a bundler appends to module ids.
#[inline]
pub fn strip_query(id: &str) -> &str {
    match id.find('?') {
        Some(pos) => &id[..pos],
        None => id,
    }
}
