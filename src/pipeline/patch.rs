//! Patch application: overlay the versioned override scripts onto the
//! extracted runtime tree.
//!
//! Every copy is attempted; the outcomes come back as a `PatchReport` and
//! the orchestrator decides what a failure means via `PatchPolicy`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{info, warn};

use crate::common::ensure_dir;
use crate::error::PatchError;

/// Override files shipped in `patch-<version>/`, all landing in `scripts/`.
pub const PATCH_FILES: [&str; 4] = ["package.js", "pkg-bundle.js", "requirePatch.js", "embed.js"];

/// First-line tag of override scripts that speak pkg-lumo's toolchain
/// protocol: the bundler takes a JSON spec and leaves the entry point alone,
/// the packager runs `prepare`/`build` and never compresses resources.
pub const PATCH_PROTOCOL: &str = "pkg-lumo protocol 1";

/// What the orchestrator does when an override could not be copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchPolicy {
    /// Log the failure and keep building.
    #[default]
    Continue,
    /// Fail the build.
    Abort,
}

impl FromStr for PatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(PatchPolicy::Continue),
            "abort" => Ok(PatchPolicy::Abort),
            other => Err(format!(
                "unknown patch policy '{}' (expected 'continue' or 'abort')",
                other
            )),
        }
    }
}

impl fmt::Display for PatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchPolicy::Continue => write!(f, "continue"),
            PatchPolicy::Abort => write!(f, "abort"),
        }
    }
}

/// One override: source file in the patch dir, destination in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// The fixed set of overrides for a runtime version.
#[derive(Debug, Clone)]
pub struct PatchSet {
    pub entries: Vec<PatchEntry>,
}

/// Result of applying one entry.
#[derive(Debug)]
pub struct PatchOutcome {
    pub entry: PatchEntry,
    pub result: Result<(), PatchError>,
}

/// Outcomes for the whole set, in set order.
#[derive(Debug, Default)]
pub struct PatchReport {
    pub outcomes: Vec<PatchOutcome>,
}

impl PatchReport {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PatchError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn all_applied(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Apply the policy: `Abort` turns the first failure into an error.
    pub fn enforce(mut self, policy: PatchPolicy) -> Result<Self, PatchError> {
        for failure in self.failures() {
            warn!("{}", failure);
        }
        if policy == PatchPolicy::Abort {
            if let Some(i) = self.outcomes.iter().position(|o| o.result.is_err()) {
                let outcome = self.outcomes.remove(i);
                if let Err(e) = outcome.result {
                    return Err(e);
                }
            }
        }
        Ok(self)
    }
}

impl PatchSet {
    /// Map every patch file in `patch_dir` to `<work_tree>/scripts/<name>`.
    pub fn for_tree(patch_dir: &Path, work_tree: &Path) -> Self {
        let scripts = work_tree.join("scripts");
        let entries = PATCH_FILES
            .iter()
            .map(|name| PatchEntry {
                source: patch_dir.join(name),
                dest: scripts.join(name),
            })
            .collect();
        Self { entries }
    }

    /// Copy every entry, overwriting unconditionally. Never stops early.
    pub fn apply(&self) -> PatchReport {
        let outcomes = self
            .entries
            .iter()
            .map(|entry| {
                let name = entry
                    .source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                info!("Copying patch {}", name);
                PatchOutcome {
                    entry: entry.clone(),
                    result: copy_patch(entry),
                }
            })
            .collect();
        PatchReport { outcomes }
    }
}

fn copy_patch(entry: &PatchEntry) -> Result<(), PatchError> {
    let fail = |reason: String| PatchError {
        source_path: entry.source.clone(),
        dest: entry.dest.clone(),
        reason,
    };
    if !entry.source.is_file() {
        return Err(fail("patch file not found".to_string()));
    }
    if let Some(parent) = entry.dest.parent() {
        ensure_dir(parent).map_err(|e| fail(e.to_string()))?;
    }
    fs::copy(&entry.source, &entry.dest).map_err(|e| fail(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(missing: &[&str]) -> (tempfile::TempDir, PatchSet) {
        let temp = tempfile::tempdir().unwrap();
        let patch_dir = temp.path().join("patch-1.8.0-beta");
        let work = temp.path().join("lumo-1.8.0-beta");
        fs::create_dir_all(&patch_dir).unwrap();
        fs::create_dir_all(work.join("scripts")).unwrap();
        for name in PATCH_FILES {
            if !missing.contains(&name) {
                fs::write(patch_dir.join(name), format!("// patched {}", name)).unwrap();
            }
            fs::write(work.join("scripts").join(name), "// original").unwrap();
        }
        let set = PatchSet::for_tree(&patch_dir, &work);
        (temp, set)
    }

    #[test]
    fn test_all_patches_applied() {
        let (_temp, set) = setup(&[]);
        let report = set.apply();
        assert_eq!(report.applied(), 4);
        for entry in &set.entries {
            let content = fs::read_to_string(&entry.dest).unwrap();
            assert!(content.starts_with("// patched"));
        }
    }

    #[test]
    fn test_missing_patch_does_not_block_others() {
        let (_temp, set) = setup(&["pkg-bundle.js"]);
        let report = set.apply();
        assert_eq!(report.applied(), 3);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].source_path.ends_with("pkg-bundle.js"));

        let report = report.enforce(PatchPolicy::Continue).unwrap();
        assert!(!report.all_applied());
    }

    #[test]
    fn test_abort_policy_fails() {
        let (_temp, set) = setup(&["embed.js"]);
        let err = set.apply().enforce(PatchPolicy::Abort).unwrap_err();
        assert!(err.dest.ends_with("scripts/embed.js"));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("Continue".parse::<PatchPolicy>(), Ok(PatchPolicy::Continue));
        assert_eq!("abort".parse::<PatchPolicy>(), Ok(PatchPolicy::Abort));
        assert!("skip".parse::<PatchPolicy>().is_err());
    }
}
