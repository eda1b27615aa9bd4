//! Resource embedding: stage the user's resource directories into the bundle
//! output tree, select what gets embedded, and compress it in place.
//!
//! The manifest is rebuilt from a directory walk on every run and never
//! persisted. Compression runs in parallel; nothing is registered with the
//! toolchain until every file has been compressed and verified.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rayon::prelude::*;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::context::BuildContext;
use crate::codec;
use crate::common::{base_name, copy_dir_all, to_slash};
use crate::error::ResourceError;

/// Files that stay on disk next to the binary and are never embedded.
const KEEP_SUFFIXES: &[&str] = &[
    "target/main.js",
    "target/bundle.js",
    "target/bundle.min.js",
    "target/google-closure-compiler-js.js",
    "target/aot.edn",
    ".aot.js.map",
];

const DEPENDENCY_PREFIX: &str = "target/node_modules";

/// The interpreter's own launcher; the binary replaces it.
const SKIPPED_LAUNCHER: &str = "node_modules/.bin/lumo";

fn is_core_output(path: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"target[\\/]cljs[\\/]core\.js").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(path))
}

/// What happened to one user resource directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyStatus {
    Copied(u64),
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct StagedResourceDir {
    pub source: PathBuf,
    pub dest: Option<PathBuf>,
    pub status: CopyStatus,
}

/// How a file in the bundle output tree is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    /// Ordinary resource, embedded.
    Resource,
    /// Part of the staged dependency tree, embedded in bulk.
    Dependency,
    /// Left on disk.
    Keep,
}

impl ResourceClass {
    pub fn is_embedded(self) -> bool {
        !matches!(self, ResourceClass::Keep)
    }
}

/// Classify a path of the form `target/...` (forward slashes).
pub fn classify(path: &str) -> ResourceClass {
    if path.starts_with(DEPENDENCY_PREFIX) {
        return ResourceClass::Dependency;
    }
    if KEEP_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
        || is_core_output(path)
    {
        return ResourceClass::Keep;
    }
    ResourceClass::Resource
}

/// Copy each resource directory into `target/<basename>`.
///
/// Relative directories resolve against `project_dir`. Nothing here is
/// fatal: missing directories are skipped, copy failures are logged.
pub fn stage_resource_dirs(
    dirs: &[PathBuf],
    project_dir: &Path,
    target_dir: &Path,
) -> Vec<StagedResourceDir> {
    dirs.iter()
        .map(|dir| {
            let source = project_dir.join(dir);
            if !source.is_dir() {
                warn!("Resource directory {} does not exist, skipping", dir.display());
                return StagedResourceDir {
                    source,
                    dest: None,
                    status: CopyStatus::Skipped,
                };
            }

            let Some(name) = base_name(&source) else {
                warn!("Resource directory {} has no name, skipping", dir.display());
                return StagedResourceDir {
                    source,
                    dest: None,
                    status: CopyStatus::Skipped,
                };
            };

            let dest = target_dir.join(name);
            info!("Copying resources {} -> {}", dir.display(), dest.display());
            let status = match copy_dir_all(&source, &dest) {
                Ok(count) => CopyStatus::Copied(count),
                Err(e) => {
                    error!("Failed to copy resource directory {}: {}", dir.display(), e);
                    CopyStatus::Failed(e.to_string())
                }
            };
            StagedResourceDir {
                source,
                dest: Some(dest),
                status,
            }
        })
        .collect()
}

/// A file picked for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedResource {
    /// Path relative to `target/`, forward slashes.
    pub rel: String,
    pub path: PathBuf,
    pub class: ResourceClass,
}

/// Walk `<work>/target` in file-name order and keep what gets embedded.
pub fn select_resources(work_tree: &Path) -> Result<Vec<SelectedResource>, ResourceError> {
    let target = work_tree.join("target");
    let mut selected = Vec::new();

    let walker = WalkDir::new(&target)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !to_slash(e.path()).ends_with(SKIPPED_LAUNCHER));

    for entry in walker {
        let entry = entry.map_err(|source| ResourceError::Walk {
            path: target.clone(),
            source,
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(&target) else {
            continue;
        };
        let rel = to_slash(rel);
        let class = classify(&format!("target/{}", rel));
        if class.is_embedded() {
            selected.push(SelectedResource {
                rel,
                path: entry.into_path(),
                class,
            });
        } else {
            debug!("Keeping target/{} on disk", rel);
        }
    }

    Ok(selected)
}

/// One compressed resource.
#[derive(Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub path: String,
    pub original_len: u64,
    /// SHA-256 of the original bytes, hex.
    pub digest: String,
    pub compressed: Vec<u8>,
}

impl fmt::Debug for ResourceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceEntry")
            .field("path", &self.path)
            .field("original_len", &self.original_len)
            .field("digest", &self.digest)
            .field("compressed_len", &self.compressed.len())
            .finish()
    }
}

/// Every embedded resource, in walk order.
#[derive(Debug, Clone, Default)]
pub struct ResourceManifest {
    pub entries: Vec<ResourceEntry>,
}

impl ResourceManifest {
    /// Compress every selected file and overwrite it with the compressed bytes.
    ///
    /// All files are compressed before any is written back, so a failure
    /// leaves the tree uncompressed rather than half-compressed.
    pub fn build(selected: &[SelectedResource]) -> Result<Self, ResourceError> {
        let entries = selected
            .par_iter()
            .map(compress_one)
            .collect::<Result<Vec<_>, _>>()?;

        for (resource, entry) in selected.iter().zip(&entries) {
            fs::write(&resource.path, &entry.compressed).map_err(|source| {
                ResourceError::Compress {
                    path: resource.path.clone(),
                    source,
                }
            })?;
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn original_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.original_len).sum()
    }

    pub fn compressed_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.compressed.len() as u64).sum()
    }

    /// Inflate every entry and check it against the recorded length and digest.
    pub fn verify(&self) -> Result<(), ResourceError> {
        self.entries.par_iter().try_for_each(|entry| {
            let fail = |reason: String| ResourceError::RoundTrip {
                path: entry.path.clone(),
                reason,
            };
            let inflated = codec::decompress(&entry.compressed).map_err(|e| fail(e.to_string()))?;
            if inflated.len() as u64 != entry.original_len {
                return Err(fail(format!(
                    "length {} != {}",
                    inflated.len(),
                    entry.original_len
                )));
            }
            if hex_digest(&inflated) != entry.digest {
                return Err(fail("digest mismatch".to_string()));
            }
            Ok(())
        })
    }

    /// Render the module the packaged binary's loader reads embedded files from.
    pub fn to_embedded_module(&self) -> Result<String, serde_json::Error> {
        let index: BTreeMap<&str, String> = self
            .entries
            .iter()
            .map(|e| (e.path.as_str(), STANDARD.encode(&e.compressed)))
            .collect();
        let json = serde_json::to_string(&index)?;
        Ok(format!(
            "'use strict';\n\n// Generated by pkg-lumo. Values are base64 zlib streams.\nmodule.exports = {};\n",
            json
        ))
    }
}

fn compress_one(resource: &SelectedResource) -> Result<ResourceEntry, ResourceError> {
    let compress_err = |source| ResourceError::Compress {
        path: resource.path.clone(),
        source,
    };
    let original = fs::read(&resource.path).map_err(compress_err)?;
    let compressed = codec::compress(&original).map_err(compress_err)?;
    Ok(ResourceEntry {
        path: resource.rel.clone(),
        original_len: original.len() as u64,
        digest: hex_digest(&original),
        compressed,
    })
}

fn hex_digest(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Copy the user's resource directories into the bundle output tree.
pub fn stage(ctx: &BuildContext) -> Vec<StagedResourceDir> {
    stage_resource_dirs(&ctx.options.resource_dirs, &ctx.project_dir, &ctx.target_dir())
}

/// Select, compress and verify everything that gets embedded.
///
/// Runs once the output tree is complete (after AOT compilation), since
/// the compiled namespaces are embedded too.
pub fn embed(ctx: &BuildContext) -> Result<ResourceManifest, ResourceError> {
    let selected = select_resources(&ctx.work_tree)?;
    let dependencies = selected
        .iter()
        .filter(|r| r.class == ResourceClass::Dependency)
        .count();
    info!(
        "Embedding {} files ({} from node_modules)",
        selected.len(),
        dependencies
    );

    let manifest = ResourceManifest::build(&selected)?;
    if manifest.is_empty() {
        warn!("Nothing selected for embedding under {}", ctx.work_tree.display());
    }
    manifest.verify()?;
    info!(
        "Compressed {} resources: {} -> {} bytes",
        manifest.len(),
        manifest.original_bytes(),
        manifest.compressed_bytes()
    );
    Ok(manifest)
}
