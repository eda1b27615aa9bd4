//! Build command - packages the project into a native binary.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::options::{BuildOptions, RuntimeFlags};
use crate::pipeline::patch::PatchPolicy;
use crate::pipeline::{BuildContext, Pipeline, Stage};
use crate::prompts::{self, BuildInputs};

/// Everything the build command takes from the command line.
#[derive(Debug, Default)]
pub struct BuildRequest {
    pub inputs: BuildInputs,
    pub flags: RuntimeFlags,
    pub output_name: Option<String>,
    pub jobs: Option<usize>,
    pub patch_policy: Option<PatchPolicy>,
    pub stop_after: Option<Stage>,
    pub keep_work_tree: bool,
}

impl BuildRequest {
    /// CLI values win over configuration.
    fn apply_to(&self, mut config: Config) -> Result<Config> {
        if let Some(name) = &self.output_name {
            config.output_name = name.clone();
        }
        if let Some(jobs) = self.jobs {
            if jobs == 0 {
                bail!("--jobs must be at least 1");
            }
            config.jobs = jobs;
        }
        if let Some(policy) = self.patch_policy {
            config.patch_policy = policy;
        }
        Ok(config)
    }
}

/// Execute the build command.
pub fn cmd_build(project_dir: &Path, request: BuildRequest, config: Config) -> Result<()> {
    let config = request.apply_to(config)?;
    let (classpath, resources, main) = prompts::complete(request.inputs.clone())?;
    let options = BuildOptions::from_input(&classpath, &resources, &main).with_flags(request.flags);

    println!("=== Packaging {} ===\n", options.main_ns);

    let ctx = BuildContext::new(project_dir, options, config)
        .with_keep_work_tree(request.keep_work_tree || request.stop_after.is_some());
    let pipeline = Pipeline::new().stop_after(request.stop_after);

    let ctx = pipeline.run(ctx).context("Build failed")?;

    match &ctx.artifact {
        Some(artifact) => println!("\nFinished building. Your binary is {}", artifact.display()),
        None => println!("\nWorking tree left at {}", ctx.work_tree.display()),
    }
    Ok(())
}
