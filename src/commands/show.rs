//! Show command - displays information.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::pipeline::Stage;
use crate::platform::Platform;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
    /// Show pipeline stages in order
    Stages,
}

/// Execute the show command.
pub fn cmd_show(project_dir: &Path, target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config => {
            config.print();
            let platform = Platform::host();
            println!();
            println!("Project:");
            println!("  Directory:    {}", project_dir.display());
            println!(
                "  Working tree: {}",
                project_dir.join(config.work_tree_name()).display()
            );
            println!(
                "  Artifact:     {}",
                project_dir
                    .join(platform.executable_name(&config.output_name))
                    .display()
            );
            println!("  Platform:     {}", platform);
        }
        ShowTarget::Stages => {
            for (i, stage) in Stage::ALL.iter().enumerate() {
                println!("  {}. {}", i + 1, stage);
            }
        }
    }
    Ok(())
}
