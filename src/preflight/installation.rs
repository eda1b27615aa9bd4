//! Checks on pkg-lumo's own installation: runtime archive and patch files.

use crate::config::Config;
use std::fs;

use crate::pipeline::patch::{PATCH_FILES, PATCH_PROTOCOL};

use super::types::CheckResult;

pub fn check_installation(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let archive = config.archive_name();
    match config.tool_home() {
        Some(home) => results.push(CheckResult::pass_with(
            &archive,
            home.join(&archive).display().to_string(),
        )),
        None => {
            let searched: Vec<_> = config
                .archive_candidates()
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            results.push(CheckResult::fail(
                &archive,
                format!("Not found. Looked in: {}", searched.join(", ")),
            ));
        }
    }

    let name = config.patch_dir_name();
    let Some(patch_dir) = config.patch_dir() else {
        results.push(CheckResult::fail(&name, "No tool home configured"));
        return results;
    };

    let missing: Vec<_> = PATCH_FILES
        .iter()
        .filter(|file| !patch_dir.join(file).is_file())
        .copied()
        .collect();
    if missing.is_empty() {
        results.push(CheckResult::pass_with(&name, patch_dir.display().to_string()));
    } else {
        // Missing patches degrade the build rather than stop it.
        results.push(CheckResult::warn(
            &name,
            format!("{} missing: {}", patch_dir.display(), missing.join(", ")),
        ));
    }

    if let Some(result) = check_protocol(&patch_dir) {
        results.push(result);
    }

    results
}

/// Scripts from another packager (e.g. stock ones) would rewrite the entry
/// point and compress resources a second time. None if no script is present.
fn check_protocol(patch_dir: &std::path::Path) -> Option<CheckResult> {
    const NAME: &str = "patch protocol";
    let present: Vec<_> = PATCH_FILES
        .iter()
        .filter_map(|file| fs::read_to_string(patch_dir.join(file)).ok().map(|text| (*file, text)))
        .collect();
    if present.is_empty() {
        return None;
    }

    let foreign: Vec<_> = present
        .iter()
        .filter(|(_, text)| !text.lines().next().is_some_and(|l| l.contains(PATCH_PROTOCOL)))
        .map(|(file, _)| *file)
        .collect();
    Some(if foreign.is_empty() {
        CheckResult::pass_with(NAME, PATCH_PROTOCOL)
    } else {
        CheckResult::fail(
            NAME,
            format!("Not written for {}: {}", PATCH_PROTOCOL, foreign.join(", ")),
        )
    })
}
