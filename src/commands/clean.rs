//! Clean command - removes state left behind by an interrupted build.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::pipeline::clean;

/// Execute the clean command.
pub fn cmd_clean(project_dir: &Path, config: &Config) -> Result<()> {
    if clean::recover_dependency_backup(project_dir)
        .context("Failed to recover dependency backup")?
    {
        println!("Restored node_modules from an interrupted build.");
    }

    let work_tree = project_dir.join(config.work_tree_name());
    if work_tree.exists() {
        clean::remove_work_tree(&work_tree)?;
        println!("Removed {}", work_tree.display());
    } else {
        println!("Nothing to clean.");
    }
    Ok(())
}
