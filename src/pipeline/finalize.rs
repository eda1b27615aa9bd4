//! Finalization: move the built binary into the project and drop the
//! working tree.

use std::path::PathBuf;

use tracing::info;

use super::context::BuildContext;
use crate::common::{move_path, remove_path};
use crate::error::FinalizeError;

/// Move the artifact into place. Returns its final path.
pub fn run(ctx: &BuildContext) -> Result<PathBuf, FinalizeError> {
    let built = ctx.built_binary();
    if !built.is_file() {
        return Err(FinalizeError::MissingBinary(built));
    }

    let artifact = ctx.artifact_path();
    // Only a regular file of the same name may be replaced.
    if artifact.is_dir() {
        return Err(FinalizeError::ArtifactIsDirectory(artifact));
    }
    move_path(&built, &artifact).map_err(|source| FinalizeError::Move {
        from: built.clone(),
        to: artifact.clone(),
        source,
    })?;

    if ctx.keep_work_tree {
        info!("Keeping working tree {}", ctx.work_tree.display());
    } else {
        remove_path(&ctx.work_tree).map_err(|source| FinalizeError::RemoveWorkTree {
            path: ctx.work_tree.clone(),
            source,
        })?;
    }

    info!("Finished building. Your binary is {}", artifact.display());
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::write_file_with_dirs;
    use crate::config::Config;
    use crate::options::BuildOptions;
    use crate::platform::Platform;
    use std::fs;
    use std::path::Path;

    fn context(project: &Path, platform: Platform) -> BuildContext {
        BuildContext::new(project, BuildOptions::from_input("", "", "my.app"), Config::default())
            .with_platform(platform)
    }

    #[test]
    fn test_moves_binary_and_removes_tree() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), Platform::Posix);
        write_file_with_dirs(ctx.built_binary(), "ELF").unwrap();
        fs::write(temp.path().join("my-lumo"), "old build").unwrap();

        let artifact = run(&ctx).unwrap();
        assert_eq!(artifact, temp.path().join("my-lumo"));
        assert_eq!(fs::read_to_string(&artifact).unwrap(), "ELF");
        assert!(!ctx.work_tree.exists());
    }

    #[test]
    fn test_windows_artifact_name() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), Platform::from_os_type("Windows_NT"))
            .with_keep_work_tree(true);
        write_file_with_dirs(ctx.built_binary(), "MZ").unwrap();
        assert!(ctx.built_binary().ends_with("build/lumo.exe"));

        let artifact = run(&ctx).unwrap();
        assert!(artifact.to_string_lossy().ends_with("my-lumo.exe"));
        assert!(ctx.work_tree.is_dir());
    }

    #[test]
    fn test_refuses_to_replace_directory() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), Platform::Posix);
        write_file_with_dirs(ctx.built_binary(), "ELF").unwrap();
        write_file_with_dirs(temp.path().join("my-lumo/src/app.cljs"), "(ns app)").unwrap();

        let err = run(&ctx).unwrap_err();
        assert!(matches!(err, FinalizeError::ArtifactIsDirectory(_)));
        assert!(temp.path().join("my-lumo/src/app.cljs").is_file());
        assert!(ctx.built_binary().is_file());
        assert!(ctx.work_tree.is_dir());
    }

    #[test]
    fn test_missing_binary_keeps_tree() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path(), Platform::Posix);
        fs::create_dir_all(&ctx.work_tree).unwrap();

        let err = run(&ctx).unwrap_err();
        assert!(matches!(err, FinalizeError::MissingBinary(_)));
        assert!(ctx.work_tree.is_dir());
    }
}
