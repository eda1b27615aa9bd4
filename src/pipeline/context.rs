//! Build context threaded through every pipeline stage.
//!
//! Holds the paths the stages operate on plus whatever earlier stages
//! produced. No stage reads the process working directory; everything is
//! resolved against `project_dir` here.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::options::BuildOptions;
use crate::platform::Platform;

use super::patch::PatchReport;
use super::resources::{ResourceManifest, StagedResourceDir};

/// Shared context for all pipeline stages.
#[derive(Debug)]
pub struct BuildContext {
    /// The caller's project directory (where the artifact lands).
    pub project_dir: PathBuf,
    /// Scratch tree: `<project>/lumo-<version>`.
    pub work_tree: PathBuf,
    pub options: BuildOptions,
    pub config: Config,
    pub platform: Platform,
    /// Leave the working tree in place after a successful build.
    pub keep_work_tree: bool,

    // Filled in by stages as they complete.
    pub patch_report: Option<PatchReport>,
    pub dependencies_staged: bool,
    pub staged_resources: Vec<StagedResourceDir>,
    pub resources: Option<ResourceManifest>,
    pub interpreter: Option<PathBuf>,
    pub artifact: Option<PathBuf>,
}

impl BuildContext {
    /// Create a new build context rooted at `project_dir`.
    pub fn new(project_dir: &Path, options: BuildOptions, config: Config) -> Self {
        let work_tree = project_dir.join(config.work_tree_name());
        Self {
            project_dir: project_dir.to_path_buf(),
            work_tree,
            options,
            config,
            platform: Platform::host(),
            keep_work_tree: false,
            patch_report: None,
            dependencies_staged: false,
            staged_resources: Vec::new(),
            resources: None,
            interpreter: None,
            artifact: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_keep_work_tree(mut self, keep: bool) -> Self {
        self.keep_work_tree = keep;
        self
    }

    /// Bundle output tree: `<work>/target`.
    pub fn target_dir(&self) -> PathBuf {
        self.work_tree.join("target")
    }

    /// Runtime build scripts: `<work>/scripts`.
    pub fn scripts_dir(&self) -> PathBuf {
        self.work_tree.join("scripts")
    }

    /// Generated bundler entry point.
    pub fn entry_point(&self) -> PathBuf {
        self.work_tree.join("src/js/pkg.js")
    }

    pub fn bundle_file(&self) -> PathBuf {
        self.target_dir().join("bundle.min.js")
    }

    pub fn staged_modules_dir(&self) -> PathBuf {
        self.target_dir().join("node_modules")
    }

    pub fn aot_dir(&self) -> PathBuf {
        self.target_dir().join("aot")
    }

    /// Native toolchain source directory, created by the toolchain's prepare step.
    pub fn toolchain_dir(&self) -> PathBuf {
        self.work_tree.join("tmp").join(&self.config.node_version)
    }

    /// Toolchain output path, relative to the working tree.
    pub fn build_output_rel(&self) -> String {
        format!("build/{}", self.platform.executable_name("lumo"))
    }

    /// Where the native toolchain leaves the executable.
    pub fn built_binary(&self) -> PathBuf {
        self.work_tree.join(self.build_output_rel())
    }

    /// Final artifact location in the project directory.
    pub fn artifact_path(&self) -> PathBuf {
        self.project_dir
            .join(self.platform.executable_name(&self.config.output_name))
    }
}
