//! Override executor - interprets `OverrideOp` variants against a toolchain tree.
//!
//! This is the only place toolchain files are modified.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use super::{BuildOverride, OverrideOp};
use crate::common::write_file_with_dirs;
use crate::error::OverrideError;

/// What applying one override did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideOutcome {
    Applied,
    AlreadyApplied,
}

/// Apply every override in order. Stops at the first failure.
pub fn execute(
    toolchain_dir: &Path,
    overrides: &[BuildOverride],
) -> Result<Vec<(String, OverrideOutcome)>, OverrideError> {
    let mut outcomes = Vec::with_capacity(overrides.len());
    for o in overrides {
        let outcome = execute_one(toolchain_dir, o)?;
        match outcome {
            OverrideOutcome::Applied => info!("Applied build override {}", o.name),
            OverrideOutcome::AlreadyApplied => {
                debug!("Build override {} already applied", o.name)
            }
        }
        outcomes.push((o.name.clone(), outcome));
    }
    Ok(outcomes)
}

fn execute_one(toolchain_dir: &Path, o: &BuildOverride) -> Result<OverrideOutcome, OverrideError> {
    let path = toolchain_dir.join(&o.target);
    let current = read_optional(&path).map_err(|source| OverrideError::Read {
        name: o.name.clone(),
        path: path.clone(),
        source,
    })?;

    let desired = match &o.op {
        OverrideOp::CopyFrom(source_path) => {
            fs::read(source_path).map_err(|source| OverrideError::Read {
                name: o.name.clone(),
                path: source_path.clone(),
                source,
            })?
        }
        OverrideOp::Preserve(_) if current.is_some() => {
            return Ok(OverrideOutcome::AlreadyApplied);
        }
        OverrideOp::Preserve(source_path) => {
            fs::read(source_path).map_err(|source| OverrideError::Read {
                name: o.name.clone(),
                path: source_path.clone(),
                source,
            })?
        }
        OverrideOp::Write(content) => content.clone(),
        OverrideOp::SpliceAfter {
            anchor,
            insert,
            marker,
        } => {
            let Some(current) = current.as_deref() else {
                return Err(OverrideError::TargetMissing {
                    name: o.name.clone(),
                    path,
                });
            };
            let text = String::from_utf8_lossy(current);
            if text.contains(marker.as_str()) {
                return Ok(OverrideOutcome::AlreadyApplied);
            }
            splice_after(&text, anchor, insert)
                .ok_or_else(|| OverrideError::AnchorMissing {
                    name: o.name.clone(),
                    path: path.clone(),
                    anchor: anchor.clone(),
                })?
                .into_bytes()
        }
    };

    if current.as_deref() == Some(desired.as_slice()) {
        return Ok(OverrideOutcome::AlreadyApplied);
    }

    write_file_with_dirs(&path, &desired).map_err(|source| OverrideError::Write {
        name: o.name.clone(),
        path,
        source,
    })?;
    Ok(OverrideOutcome::Applied)
}

fn read_optional(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Insert `insert` right after the first `anchor`; None if the anchor is absent.
pub fn splice_after(text: &str, anchor: &str, insert: &str) -> Option<String> {
    let at = text.find(anchor)? + anchor.len();
    let mut out = String::with_capacity(text.len() + insert.len());
    out.push_str(&text[..at]);
    out.push_str(insert);
    out.push_str(&text[at..]);
    Some(out)
}
