//! Utilities for copying and moving directory trees.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::files::ensure_dir;

/// Recursively copy `src` into `dst`, overwriting files that already exist.
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut copied = 0;
    ensure_dir(dst)?;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Move a file or directory, replacing whatever is at `dst`.
///
/// Falls back to copy-then-delete when a rename is impossible (e.g. the
/// two paths are on different filesystems).
pub fn move_path(src: &Path, dst: &Path) -> io::Result<()> {
    remove_path(dst)?;
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !src.exists() {
                return Err(rename_err);
            }
            if src.is_dir() {
                copy_dir_all(src, dst)?;
                fs::remove_dir_all(src)
            } else {
                fs::copy(src, dst)?;
                fs::remove_file(src)
            }
        }
    }
}

/// Remove a file or directory tree; a missing path is not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Render a relative path with forward slashes, whatever the host separator.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Last path component, resolving `.`/`..`-style paths through the filesystem.
pub fn base_name(path: &Path) -> Option<PathBuf> {
    match path.file_name() {
        Some(name) => Some(PathBuf::from(name)),
        None => path
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(PathBuf::from)),
    }
}
