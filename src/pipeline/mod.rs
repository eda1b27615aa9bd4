//! The packaging pipeline.
//!
//! Stages run strictly in order, each taking the `BuildContext` and handing
//! it on:
//!
//! ```text
//! Clean -> Extract -> Patch -> Bundle -> StageDeps -> EmbedResources
//!       -> CompileAot -> Package -> Finalize
//! ```
//!
//! A fatal error stops the run and leaves the working tree in place for
//! inspection. Only `Finalize` removes it.

pub mod aot;
pub mod bundle;
pub mod clean;
pub mod context;
pub mod deps;
pub mod entry;
pub mod extract;
pub mod finalize;
pub mod package;
pub mod patch;
pub mod resources;

pub use context::BuildContext;

use std::fmt;
use std::str::FromStr;

use tracing::{error, info, info_span, warn};

use crate::error::PipelineError;
use crate::timing::Timer;
use patch::PatchSet;
use resources::CopyStatus;

/// Pipeline stages in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Clean,
    Extract,
    Patch,
    Bundle,
    StageDeps,
    EmbedResources,
    CompileAot,
    Package,
    Finalize,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Clean,
        Stage::Extract,
        Stage::Patch,
        Stage::Bundle,
        Stage::StageDeps,
        Stage::EmbedResources,
        Stage::CompileAot,
        Stage::Package,
        Stage::Finalize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::Extract => "extract",
            Stage::Patch => "patch",
            Stage::Bundle => "bundle",
            Stage::StageDeps => "stage-deps",
            Stage::EmbedResources => "embed-resources",
            Stage::CompileAot => "compile-aot",
            Stage::Package => "package",
            Stage::Finalize => "finalize",
        }
    }

    fn run(self, ctx: BuildContext) -> Result<BuildContext, PipelineError> {
        match self {
            Stage::Clean => run_clean(ctx),
            Stage::Extract => run_extract(ctx),
            Stage::Patch => run_patch(ctx),
            Stage::Bundle => run_bundle(ctx),
            Stage::StageDeps => run_stage_deps(ctx),
            Stage::EmbedResources => run_embed_resources(ctx),
            Stage::CompileAot => run_compile_aot(ctx),
            Stage::Package => run_package(ctx),
            Stage::Finalize => run_finalize(ctx),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = Stage::ALL.iter().map(|s| s.name()).collect();
                format!("unknown stage '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Sequential stage runner.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stop_after: Option<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// End the run after `stage`, leaving the working tree in place.
    pub fn stop_after(mut self, stage: Option<Stage>) -> Self {
        self.stop_after = stage;
        self
    }

    /// Stages this pipeline will run.
    pub fn stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .take_while(|stage| self.stop_after.map_or(true, |last| *stage <= last))
            .collect()
    }

    pub fn run(&self, mut ctx: BuildContext) -> Result<BuildContext, PipelineError> {
        let total = Timer::start("Total");
        for stage in self.stages() {
            let span = info_span!("stage", name = stage.name());
            let _enter = span.enter();

            let timer = Timer::start(stage.name());
            let work_tree = ctx.work_tree.clone();
            ctx = match stage.run(ctx) {
                Ok(ctx) => ctx,
                Err(e) => {
                    error!("{}", e);
                    if work_tree.exists() {
                        error!("Working tree left for inspection: {}", work_tree.display());
                    }
                    return Err(e);
                }
            };
            timer.finish();
        }
        total.finish();

        if let Some(stage) = self.stop_after.filter(|s| *s != Stage::Finalize) {
            info!(
                "Stopped after {}; working tree at {}",
                stage,
                ctx.work_tree.display()
            );
        }
        Ok(ctx)
    }
}

fn run_clean(ctx: BuildContext) -> Result<BuildContext, PipelineError> {
    clean::run(&ctx)?;
    Ok(ctx)
}

fn run_extract(ctx: BuildContext) -> Result<BuildContext, PipelineError> {
    extract::run(&ctx)?;
    Ok(ctx)
}

fn run_patch(mut ctx: BuildContext) -> Result<BuildContext, PipelineError> {
    let patch_dir = ctx
        .config
        .patch_dir()
        .unwrap_or_else(|| ctx.project_dir.join(ctx.config.patch_dir_name()));
    info!("Applying patches from {}", patch_dir.display());

    let report = PatchSet::for_tree(&patch_dir, &ctx.work_tree).apply();
    let report = report.enforce(ctx.config.patch_policy)?;
    if !report.all_applied() {
        warn!(
            "Continuing with {} of {} patches applied",
            report.applied(),
            report.outcomes.len()
        );
    }
    ctx.patch_report = Some(report);
    Ok(ctx)
}

fn run_bundle(ctx: BuildContext) -> Result<BuildContext, PipelineError> {
    bundle::run(&ctx)?;
    Ok(ctx)
}

fn run_stage_deps(mut ctx: BuildContext) -> Result<BuildContext, PipelineError> {
    let outcome = deps::run(&ctx)?;
    ctx.dependencies_staged = outcome == deps::StageOutcome::Staged;
    Ok(ctx)
}

fn run_embed_resources(mut ctx: BuildContext) -> Result<BuildContext, PipelineError> {
    let staged = resources::stage(&ctx);
    let failed = staged
        .iter()
        .filter(|s| matches!(s.status, CopyStatus::Failed(_)))
        .count();
    if failed > 0 {
        warn!("{} resource directories could not be copied", failed);
    }
    ctx.staged_resources = staged;
    Ok(ctx)
}

fn run_compile_aot(mut ctx: BuildContext) -> Result<BuildContext, PipelineError> {
    let interpreter = aot::run(&ctx)?;
    ctx.interpreter = Some(interpreter);
    Ok(ctx)
}

fn run_package(mut ctx: BuildContext) -> Result<BuildContext, PipelineError> {
    let manifest = resources::embed(&ctx)?;
    ctx.resources = Some(manifest);
    package::run(&ctx)?;
    Ok(ctx)
}

fn run_finalize(mut ctx: BuildContext) -> Result<BuildContext, PipelineError> {
    let artifact = finalize::run(&ctx)?;
    ctx.artifact = Some(artifact);
    Ok(ctx)
}
