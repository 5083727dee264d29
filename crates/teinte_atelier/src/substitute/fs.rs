//! Filesystem helpers for package copies.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{ThemeError, ThemeResult};

/// Top-level entries never copied between package locations.
const SKIPPED_ENTRIES: &[&str] = &["node_modules", "bin"];

/// Copy the tree at `from` over `to`, overwriting files, never removing any.
///
/// Returns the number of files copied.
pub fn copy_tree(from: &Path, to: &Path) -> ThemeResult<usize> {
    copy_tree_excluding(from, to, &[])
}

/// [`copy_tree`], additionally leaving out the top-level entries `excluded`.
pub fn copy_tree_excluding(from: &Path, to: &Path, excluded: &[&str]) -> ThemeResult<usize> {
    let mut copied = 0;
    let walker = WalkDir::new(from).min_depth(1).into_iter().filter_entry(|entry| {
        entry.depth() != 1
            || !SKIPPED_ENTRIES
                .iter()
                .chain(excluded)
                .any(|skipped| entry.file_name() == *skipped)
    });

    fs::create_dir_all(to).map_err(|e| ThemeError::io(to, e))?;
    for entry in walker {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| ThemeError::io(&target, e))?;
        } else if entry.path().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ThemeError::io(parent, e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| ThemeError::io(&target, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Replace `to` with a fresh copy of `from`.
pub fn replace_tree(from: &Path, to: &Path) -> ThemeResult<usize> {
    remove_tree(to)?;
    copy_tree(from, to)
}

pub fn remove_tree(path: &Path) -> ThemeResult<()> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| ThemeError::io(path, e))?;
    }
    Ok(())
}

/// Write a file, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> ThemeResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ThemeError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| ThemeError::io(path, e))
}
