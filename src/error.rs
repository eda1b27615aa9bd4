//! Error types for the packaging pipeline.
//!
//! Every stage has its own error enum so the orchestrator (and tests) can
//! tell which part of the build failed. `PipelineError` unifies them.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to run an external program.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to execute '{program}'. Is it installed?")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{message} (exit code {code})")]
    Failed {
        message: String,
        code: i32,
        stderr: String,
    },
}

impl ProcessError {
    /// Exit code of a failed process, -1 if it never ran or died by signal.
    pub fn code(&self) -> i32 {
        match self {
            ProcessError::Spawn { .. } => -1,
            ProcessError::Failed { code, .. } => *code,
        }
    }
}

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Failed to remove stale working tree {path}: {source}")]
    RemoveWorkTree {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Both {modules} and {backup} exist. A previous run was interrupted; \
         decide which one to keep and remove the other"
    )]
    AmbiguousBackup { modules: PathBuf, backup: PathBuf },

    #[error("Failed to restore dependency backup {backup}: {source}")]
    RestoreBackup {
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Runtime archive not found (looked in: {})", format_paths(.searched))]
    ArchiveMissing { searched: Vec<PathBuf> },

    #[error("Failed to read runtime archive {path}: {source}")]
    ArchiveUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt runtime archive {path}: {source}")]
    ArchiveCorrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Archive entry has an unsafe path: {0}")]
    UnsafeEntry(String),

    #[error("Working tree {0} already exists; it must be removed before extraction")]
    StaleWorkingTree(PathBuf),

    #[error("Archive did not contain the runtime root {0}")]
    MissingRoot(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Installing runtime dependencies failed: {0}")]
    DependencyInstall(#[source] ProcessError),
}

/// One override file that could not be copied.
#[derive(Debug, Error)]
#[error("Failed to copy patch {source_path} -> {dest}: {reason}")]
pub struct PatchError {
    pub source_path: PathBuf,
    pub dest: PathBuf,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Failed to read compiler version from {path}: {source}")]
    VersionSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No ClojureScript version found in the first line of {path}: {line:?}")]
    VersionPattern { path: PathBuf, line: String },

    #[error("Failed to serialize bundler configuration: {0}")]
    Spec(#[from] serde_json::Error),

    #[error("Failed to prepare bundle inputs: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bundler failed: {0}")]
    Bundler(#[source] ProcessError),

    #[error("Bundler exited successfully but {0} was not produced")]
    MissingOutput(PathBuf),
}

#[derive(Debug, Error)]
pub enum DependencyStageError {
    #[error("A dependency backup already exists at {0}")]
    BackupExists(PathBuf),

    #[error("Failed to move {from} -> {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Installing production dependencies failed: {0}")]
    Install(#[source] ProcessError),

    #[error("Failed to restore dependency backup {backup}: {source}")]
    Restore {
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to compress resource {path}: {source}")]
    Compress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Embedded resource {path} does not round-trip: {reason}")]
    RoundTrip { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum AotCompileError {
    #[error("Invalid main namespace {0:?}")]
    InvalidNamespace(String),

    #[error("Installing interpreter lumo-cljs@{version} failed: {source}")]
    Install {
        version: String,
        #[source]
        source: ProcessError,
    },

    #[error("Interpreter binary not found at {0}")]
    InterpreterMissing(PathBuf),

    #[error("AOT compilation failed: {0}")]
    Compile(#[source] ProcessError),

    #[error("Namespace {0} did not load; no compilation success signal was written")]
    NamespaceNotLoaded(String),

    #[error("Failed to prepare AOT output: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("Override '{name}': failed to read {path}: {source}")]
    Read {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Override '{name}': failed to write {path}: {source}")]
    Write {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Override '{name}': anchor {anchor:?} not found in {path}")]
    AnchorMissing {
        name: String,
        path: PathBuf,
        anchor: String,
    },

    #[error("Override '{name}': target {path} does not exist")]
    TargetMissing { name: String, path: PathBuf },
}

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("Failed to serialize toolchain configuration: {0}")]
    Spec(#[from] serde_json::Error),

    #[error("Toolchain prepare step failed: {0}")]
    Prepare(#[source] ProcessError),

    #[error("Toolchain source directory {0} was not created by the prepare step")]
    MissingToolchainDir(PathBuf),

    #[error(transparent)]
    Override(#[from] OverrideError),

    #[error("Native build failed: {0}")]
    Build(#[source] ProcessError),

    #[error("Resources were not embedded before packaging")]
    ResourcesNotEmbedded,
}

#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("Built binary not found at {0}")]
    MissingBinary(PathBuf),

    #[error("{0} is a directory; refusing to replace it with the built binary")]
    ArtifactIsDirectory(PathBuf),

    #[error("Failed to move {from} -> {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove working tree {path}: {source}")]
    RemoveWorkTree {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Any fatal pipeline failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("clean: {0}")]
    Clean(#[from] CleanError),

    #[error("extract: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("patch: {0}")]
    Patch(#[from] PatchError),

    #[error("bundle: {0}")]
    Bundle(#[from] BundleError),

    #[error("stage dependencies: {0}")]
    DependencyStage(#[from] DependencyStageError),

    #[error("embed resources: {0}")]
    Resource(#[from] ResourceError),

    #[error("aot compile: {0}")]
    AotCompile(#[from] AotCompileError),

    #[error("package: {0}")]
    Packaging(#[from] PackagingError),

    #[error("finalize: {0}")]
    Finalize(#[from] FinalizeError),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
