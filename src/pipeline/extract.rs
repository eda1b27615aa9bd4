//! Archive extraction: unpack the versioned runtime into the working tree.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::info;

use super::context::BuildContext;
use crate::common::write_file_with_dirs;
use crate::error::ExtractionError;
use crate::process::Cmd;

/// Extract the runtime archive into the project directory and install its
/// npm dependencies.
pub fn run(ctx: &BuildContext) -> Result<(), ExtractionError> {
    if ctx.work_tree.exists() {
        return Err(ExtractionError::StaleWorkingTree(ctx.work_tree.clone()));
    }

    let archive = locate_archive(&ctx.config.archive_candidates())?;
    info!("Extracting {}", archive.display());
    let written = extract_archive(&archive, &ctx.project_dir)?;
    info!("Extracted {} files", written);

    if !ctx.work_tree.is_dir() {
        return Err(ExtractionError::MissingRoot(ctx.work_tree.clone()));
    }

    info!("Installing runtime npm dependencies...");
    Cmd::new(&ctx.config.npm)
        .arg("install")
        .dir(&ctx.work_tree)
        .error_msg("npm install in the runtime tree failed")
        .run_interactive()
        .map_err(ExtractionError::DependencyInstall)?;

    Ok(())
}

/// First candidate that is an existing file.
pub fn locate_archive(candidates: &[PathBuf]) -> Result<PathBuf, ExtractionError> {
    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| ExtractionError::ArchiveMissing {
            searched: candidates.to_vec(),
        })
}

/// Write every file entry of `archive` below `dest`, in archive order.
///
/// The archive is read into memory in one go. Directory entries are
/// skipped; directories come into being as files are written. Returns the
/// number of files written.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, ExtractionError> {
    let bytes = fs::read(archive).map_err(|source| ExtractionError::ArchiveUnreadable {
        path: archive.to_path_buf(),
        source,
    })?;
    let corrupt = |source| ExtractionError::ArchiveCorrupt {
        path: archive.to_path_buf(),
        source,
    };

    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).map_err(corrupt)?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(corrupt)?;
        if entry.is_dir() {
            continue;
        }

        let rel = entry
            .enclosed_name()
            .ok_or_else(|| ExtractionError::UnsafeEntry(entry.name().to_string()))?;
        let target = dest.join(rel);

        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|source| ExtractionError::ArchiveUnreadable {
                path: archive.to_path_buf(),
                source,
            })?;

        let write_err = |source| ExtractionError::Write {
            path: target.clone(),
            source,
        };
        write_file_with_dirs(&target, &content).map_err(write_err)?;

        #[cfg(unix)]
        {
            if let Some(mode) = entry.unix_mode() {
                crate::common::files::set_mode(&target, mode & 0o7777).map_err(write_err)?;
            }
        }

        written += 1;
    }

    Ok(written)
}
