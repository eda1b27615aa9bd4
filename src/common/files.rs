//! Utilities for file operations with automatic parent directory creation.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

/// Write a file, creating parent directories as needed.
///
/// The write is attempted first; only when the parent is missing is the
/// directory chain created (one level at a time, see [`ensure_dir`]) and the
/// write retried. Partially created trees from an earlier entry, or from a
/// concurrent writer, are tolerated.
pub fn write_file_with_dirs<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> io::Result<()> {
    let path = path.as_ref();
    let content = content.as_ref();
    match fs::write(path, content) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                ensure_dir(parent)?;
            }
            fs::write(path, content)
        }
        Err(e) => Err(e),
    }
}

/// Create a directory, creating missing ancestors first.
///
/// Each level is created with a single `create_dir`; `AlreadyExists` is not
/// an error, so a tree that is half there is simply completed.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if let Some(parent) = dir.parent() {
                ensure_dir(parent)?;
            }
            match fs::create_dir(dir) {
                Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
                other => other,
            }
        }
        Err(e) => Err(e),
    }
}

/// Delete a file if it exists.
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Set Unix permission bits on a file.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}
