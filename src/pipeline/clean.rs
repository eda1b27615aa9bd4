//! Clean stage: clear state left behind by an earlier run.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::context::BuildContext;
use super::deps::{BACKUP_DIR, MODULES_DIR};
use crate::common::move_path;
use crate::error::CleanError;

/// Remove a stale working tree and recover a stranded dependency backup.
pub fn run(ctx: &BuildContext) -> Result<(), CleanError> {
    recover_dependency_backup(&ctx.project_dir)?;
    remove_work_tree(&ctx.work_tree)
}

pub fn remove_work_tree(work_tree: &Path) -> Result<(), CleanError> {
    if work_tree.exists() {
        info!("Removing stale working tree {}", work_tree.display());
        fs::remove_dir_all(work_tree).map_err(|source| CleanError::RemoveWorkTree {
            path: work_tree.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Put back `node_modules_bak` if an interrupted run left it behind.
///
/// Returns true if a backup was restored.
pub fn recover_dependency_backup(project_dir: &Path) -> Result<bool, CleanError> {
    let modules = project_dir.join(MODULES_DIR);
    let backup = project_dir.join(BACKUP_DIR);

    if !backup.exists() {
        return Ok(false);
    }
    if modules.exists() {
        return Err(CleanError::AmbiguousBackup { modules, backup });
    }

    warn!(
        "Found {} from an interrupted run; restoring it to {}",
        backup.display(),
        modules.display()
    );
    move_path(&backup, &modules).map_err(|source| CleanError::RestoreBackup {
        backup: backup.clone(),
        source,
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restores_stranded_backup() {
        let temp = tempfile::tempdir().unwrap();
        let backup = temp.path().join(BACKUP_DIR);
        fs::create_dir_all(backup.join("left-pad")).unwrap();

        assert!(recover_dependency_backup(temp.path()).unwrap());
        assert!(temp.path().join("node_modules/left-pad").is_dir());
        assert!(!backup.exists());
    }

    #[test]
    fn test_refuses_when_both_exist() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join(BACKUP_DIR)).unwrap();
        fs::create_dir_all(temp.path().join(MODULES_DIR)).unwrap();
        let err = recover_dependency_backup(temp.path()).unwrap_err();
        assert!(matches!(err, CleanError::AmbiguousBackup { .. }));
    }

    #[test]
    fn test_nothing_to_recover() {
        let temp = tempfile::tempdir().unwrap();
        assert!(!recover_dependency_backup(temp.path()).unwrap());
    }

    #[test]
    fn test_remove_work_tree() {
        let temp = tempfile::tempdir().unwrap();
        let tree = temp.path().join("lumo-1.8.0-beta/target");
        fs::create_dir_all(&tree).unwrap();
        remove_work_tree(&temp.path().join("lumo-1.8.0-beta")).unwrap();
        assert!(!temp.path().join("lumo-1.8.0-beta").exists());
        remove_work_tree(&temp.path().join("lumo-1.8.0-beta")).unwrap();
    }
}
