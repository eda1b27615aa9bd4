//! Dependency staging: install the project's production npm dependencies
//! and move them into the bundle's `target/node_modules`.
//!
//! The caller's own `node_modules` is moved aside for the duration of the
//! install. Ownership of that location is held by a `DependencyBackup`
//! guard; whichever way the stage exits, the guard puts the original tree
//! back.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use super::context::BuildContext;
use crate::common::{move_path, remove_path};
use crate::error::DependencyStageError;
use crate::process::Cmd;

pub const MODULES_DIR: &str = "node_modules";
pub const BACKUP_DIR: &str = "node_modules_bak";
pub const MANIFEST_FILE: &str = "package.json";

/// What the stage did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// No `package.json` in the project.
    Skipped,
    /// The install left no `node_modules`: nothing to bundle.
    NoDependencies,
    Staged,
}

/// Holds the caller's `node_modules` moved aside to `node_modules_bak`.
///
/// `release` restores it and reports failure; if the guard is dropped
/// without being released (error return, panic) the restore still runs
/// and failures are logged.
#[derive(Debug)]
pub struct DependencyBackup {
    modules: PathBuf,
    backup: PathBuf,
    restored: bool,
}

impl DependencyBackup {
    /// Move `<project>/node_modules` aside if it exists.
    pub fn acquire(project_dir: &Path) -> Result<Option<Self>, DependencyStageError> {
        let modules = project_dir.join(MODULES_DIR);
        let backup = project_dir.join(BACKUP_DIR);

        if !modules.exists() {
            return Ok(None);
        }
        if backup.exists() {
            return Err(DependencyStageError::BackupExists(backup));
        }

        move_path(&modules, &backup).map_err(|source| DependencyStageError::Move {
            from: modules.clone(),
            to: backup.clone(),
            source,
        })?;
        info!("Moved {} aside to {}", modules.display(), backup.display());

        Ok(Some(Self {
            modules,
            backup,
            restored: false,
        }))
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Restore the original tree, discarding anything left in its place.
    pub fn release(mut self) -> Result<(), DependencyStageError> {
        self.restore()
    }

    fn restore(&mut self) -> Result<(), DependencyStageError> {
        if self.restored {
            return Ok(());
        }
        let restore_err = |source| DependencyStageError::Restore {
            backup: self.backup.clone(),
            source,
        };
        remove_path(&self.modules).map_err(restore_err)?;
        move_path(&self.backup, &self.modules).map_err(restore_err)?;
        self.restored = true;
        info!("Restored {}", self.modules.display());
        Ok(())
    }
}

impl Drop for DependencyBackup {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            error!(
                "{}. Restore it manually: move {} to {}",
                e,
                self.backup.display(),
                self.modules.display()
            );
        }
    }
}

/// Stage production dependencies into `target/node_modules`.
pub fn run(ctx: &BuildContext) -> Result<StageOutcome, DependencyStageError> {
    stage(&ctx.project_dir, &ctx.staged_modules_dir(), &ctx.config.npm)
}

pub fn stage(
    project_dir: &Path,
    staged_dir: &Path,
    npm: &str,
) -> Result<StageOutcome, DependencyStageError> {
    if !project_dir.join(MANIFEST_FILE).is_file() {
        info!("No package.json found, no npm deps will be bundled");
        return Ok(StageOutcome::Skipped);
    }

    let backup = DependencyBackup::acquire(project_dir)?;
    if let Some(held) = &backup {
        debug!("Project node_modules held at {}", held.backup_path().display());
    }

    info!("Installing production node modules via `npm install --production`");
    Cmd::new(npm)
        .args(["install", "--production"])
        .dir(project_dir)
        .error_msg("npm install --production failed")
        .run_interactive()
        .map_err(DependencyStageError::Install)?;

    let installed = project_dir.join(MODULES_DIR);
    if !installed.is_dir() {
        // A project with no production dependencies gets no node_modules.
        info!("No production dependencies installed, nothing to bundle");
        if let Some(backup) = backup {
            backup.release()?;
        }
        return Ok(StageOutcome::NoDependencies);
    }

    info!("Moving node_modules to be bundled");
    move_path(&installed, staged_dir).map_err(|source| DependencyStageError::Move {
        from: installed.clone(),
        to: staged_dir.to_path_buf(),
        source,
    })?;

    if let Some(backup) = backup {
        backup.release()?;
    }
    Ok(StageOutcome::Staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_acquire_without_modules() {
        let temp = tempfile::tempdir().unwrap();
        assert!(DependencyBackup::acquire(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_drop_restores_backup() {
        let temp = tempfile::tempdir().unwrap();
        let modules = temp.path().join(MODULES_DIR);
        fs::create_dir_all(modules.join("left-pad")).unwrap();
        fs::write(modules.join("left-pad/index.js"), "original").unwrap();

        {
            let guard = DependencyBackup::acquire(temp.path()).unwrap().unwrap();
            assert!(guard.backup_path().is_dir());
            assert!(!modules.exists());
            // Simulate a half-finished install in the original location.
            fs::create_dir_all(modules.join("partial")).unwrap();
        }

        assert_eq!(
            fs::read_to_string(modules.join("left-pad/index.js")).unwrap(),
            "original"
        );
        assert!(!modules.join("partial").exists());
        assert!(!temp.path().join(BACKUP_DIR).exists());
    }

    #[test]
    fn test_refuses_to_clobber_existing_backup() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join(MODULES_DIR)).unwrap();
        fs::create_dir_all(temp.path().join(BACKUP_DIR)).unwrap();
        let err = DependencyBackup::acquire(temp.path()).unwrap_err();
        assert!(matches!(err, DependencyStageError::BackupExists(_)));
        assert!(temp.path().join(MODULES_DIR).is_dir());
    }

    #[cfg(unix)]
    fn fake_npm(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("npm");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[test]
    #[serial_test::serial]
    fn test_no_production_dependencies_is_not_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("project");
        fs::create_dir_all(project.join(MODULES_DIR).join("dev-only")).unwrap();
        fs::write(project.join(MANIFEST_FILE), "{}").unwrap();
        let npm = fake_npm(temp.path(), "exit 0");
        let staged = temp.path().join("target/node_modules");

        let outcome = stage(&project, &staged, &npm).unwrap();

        assert_eq!(outcome, StageOutcome::NoDependencies);
        assert!(!staged.exists());
        assert!(project.join(MODULES_DIR).join("dev-only").is_dir());
        assert!(!project.join(BACKUP_DIR).exists());
    }

    #[cfg(unix)]
    #[test]
    #[serial_test::serial]
    fn test_install_moved_into_target() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("project");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join(MANIFEST_FILE), "{}").unwrap();
        let npm = fake_npm(temp.path(), "mkdir -p node_modules/left-pad");
        let staged = temp.path().join("target/node_modules");

        let outcome = stage(&project, &staged, &npm).unwrap();

        assert_eq!(outcome, StageOutcome::Staged);
        assert!(staged.join("left-pad").is_dir());
        assert!(!project.join(MODULES_DIR).exists());
    }

    #[test]
    fn test_skipped_without_manifest() {
        let temp = tempfile::tempdir().unwrap();
        let outcome = stage(temp.path(), &temp.path().join("staged"), "npm").unwrap();
        assert_eq!(outcome, StageOutcome::Skipped);
    }
}
