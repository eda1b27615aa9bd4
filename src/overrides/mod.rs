//! Declarative build overrides for the native packaging toolchain.
//!
//! The toolchain's own project files (its build descriptor and its module
//! loader) need a handful of edits before it is invoked. Rather than editing
//! them ad hoc, each edit is described as data:
//!
//! ```text
//! BuildOverride {                         execute(dir, overrides)
//!   name:   "register-closure-compiler",    for o in overrides {
//!   target: "node.gyp",                        if o.op.is_applied(..) { skip }
//!   op:     SpliceAfter { anchor, insert },    write(o.op.transform(..))
//! }                                          }
//! ```
//!
//! Every op knows how to detect that it has already been applied, so running
//! the list twice leaves the toolchain tree unchanged.

pub mod executor;

pub use executor::{execute, OverrideOutcome};

use std::path::PathBuf;

/// One edit to a file inside the toolchain source directory.
#[derive(Debug, Clone)]
pub struct BuildOverride {
    /// Human-readable name for logging.
    pub name: String,
    /// Target path, relative to the toolchain source directory.
    pub target: PathBuf,
    pub op: OverrideOp,
}

/// What to do to the target file.
#[derive(Debug, Clone)]
pub enum OverrideOp {
    /// Replace the target with the contents of a file read at apply time.
    CopyFrom(PathBuf),
    /// Copy a file to the target once. An existing target is never touched,
    /// so the first copy survives later edits to the source.
    Preserve(PathBuf),
    /// Replace the target with the given bytes.
    Write(Vec<u8>),
    /// Insert `insert` directly after the first occurrence of `anchor`.
    /// The target counts as patched once it contains `marker`.
    SpliceAfter {
        anchor: String,
        insert: String,
        marker: String,
    },
}

impl BuildOverride {
    pub fn copy_from(name: &str, target: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            target: target.into(),
            op: OverrideOp::CopyFrom(source.into()),
        }
    }

    pub fn preserve(name: &str, target: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            target: target.into(),
            op: OverrideOp::Preserve(source.into()),
        }
    }

    pub fn write(name: &str, target: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            target: target.into(),
            op: OverrideOp::Write(content.into()),
        }
    }

    /// Splice a quoted entry into a gyp-style file list after `anchor`.
    pub fn splice_after(
        name: &str,
        target: impl Into<PathBuf>,
        anchor: &str,
        insert: &str,
        marker: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            target: target.into(),
            op: OverrideOp::SpliceAfter {
                anchor: anchor.to_string(),
                insert: insert.to_string(),
                marker: marker.to_string(),
            },
        }
    }
}
