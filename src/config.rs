//! Configuration management for pkg-lumo.
//!
//! Reads configuration from environment variables (a `.env` file is loaded
//! into the environment by `main` via dotenvy). CLI flags are applied on top
//! by the command layer.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use semver::Version;

use crate::pipeline::patch::PatchPolicy;

/// Runtime packaged by default.
pub const DEFAULT_RUNTIME_VERSION: &str = "1.8.0-beta";
/// Node version the native toolchain builds against.
pub const DEFAULT_NODE_VERSION: &str = "9.11.2";
/// Name of the finished executable (without platform suffix).
pub const DEFAULT_OUTPUT_NAME: &str = "my-lumo";
pub const DEFAULT_JOBS: usize = 8;

pub const RUNTIME_NAME: &str = "lumo";

/// pkg-lumo configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directories searched for the runtime archive and patch directory, in order.
    pub tool_homes: Vec<PathBuf>,
    /// Runtime version to unpack and compile against.
    pub runtime_version: Version,
    /// Node version for the native toolchain.
    pub node_version: String,
    /// Final artifact name, platform suffix added at finalize time.
    pub output_name: String,
    /// Parallel native build jobs.
    pub jobs: usize,
    pub npm: String,
    pub node: String,
    /// Globally installed interpreter to try before installing one.
    pub interpreter: String,
    pub patch_policy: PatchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool_homes: default_tool_homes(None),
            runtime_version: Version::new(1, 8, 0),
            node_version: DEFAULT_NODE_VERSION.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            jobs: DEFAULT_JOBS,
            npm: "npm".to_string(),
            node: "node".to_string(),
            interpreter: RUNTIME_NAME.to_string(),
            patch_policy: PatchPolicy::Continue,
        }
        .with_runtime_version(default_runtime_version())
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            tool_homes: default_tool_homes(lookup("PKG_LUMO_HOME").map(PathBuf::from)),
            ..Self::default()
        };

        if let Some(version) = lookup("PKG_LUMO_RUNTIME_VERSION") {
            let version = Version::parse(version.trim())
                .with_context(|| format!("PKG_LUMO_RUNTIME_VERSION={} is not a version", version))?;
            config.runtime_version = version;
        }

        if let Some(node) = lookup("PKG_LUMO_NODE_VERSION") {
            config.node_version = node.trim().to_string();
        }

        if let Some(name) = lookup("PKG_LUMO_OUTPUT_NAME") {
            config.output_name = name.trim().to_string();
        }

        if let Some(jobs) = lookup("PKG_LUMO_JOBS") {
            config.jobs = parse_jobs(&jobs)?;
        }

        if let Some(npm) = lookup("PKG_LUMO_NPM") {
            config.npm = npm;
        }
        if let Some(node) = lookup("PKG_LUMO_NODE") {
            config.node = node;
        }
        if let Some(interpreter) = lookup("PKG_LUMO_INTERPRETER") {
            config.interpreter = interpreter;
        }

        if let Some(policy) = lookup("PKG_LUMO_PATCH_POLICY") {
            config.patch_policy = policy.parse().map_err(anyhow::Error::msg)?;
        }

        Ok(config)
    }

    pub fn with_runtime_version(mut self, version: Version) -> Self {
        self.runtime_version = version;
        self
    }

    /// Name of the scratch working tree, e.g. `lumo-1.8.0-beta`.
    pub fn work_tree_name(&self) -> String {
        format!("{}-{}", RUNTIME_NAME, self.runtime_version)
    }

    /// File name of the runtime archive.
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.work_tree_name())
    }

    /// Directory name holding the override files.
    pub fn patch_dir_name(&self) -> String {
        format!("patch-{}", self.runtime_version)
    }

    /// All locations where the runtime archive may live, in search order.
    pub fn archive_candidates(&self) -> Vec<PathBuf> {
        self.tool_homes
            .iter()
            .map(|home| home.join(self.archive_name()))
            .collect()
    }

    /// The first tool home that contains the runtime archive.
    pub fn tool_home(&self) -> Option<&Path> {
        self.tool_homes
            .iter()
            .find(|home| home.join(self.archive_name()).is_file())
            .map(PathBuf::as_path)
    }

    /// Patch directory next to the archive, or in the first tool home.
    pub fn patch_dir(&self) -> Option<PathBuf> {
        self.tool_home()
            .or_else(|| self.tool_homes.first().map(PathBuf::as_path))
            .map(|home| home.join(self.patch_dir_name()))
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        for (i, home) in self.tool_homes.iter().enumerate() {
            println!("  PKG_LUMO_HOME[{}]: {}", i, home.display());
        }
        println!("  PKG_LUMO_RUNTIME_VERSION: {}", self.runtime_version);
        println!("  PKG_LUMO_NODE_VERSION: {}", self.node_version);
        println!("  PKG_LUMO_OUTPUT_NAME: {}", self.output_name);
        println!("  PKG_LUMO_JOBS: {}", self.jobs);
        println!("  PKG_LUMO_NPM: {}", self.npm);
        println!("  PKG_LUMO_NODE: {}", self.node);
        println!("  PKG_LUMO_INTERPRETER: {}", self.interpreter);
        println!("  PKG_LUMO_PATCH_POLICY: {}", self.patch_policy);
        match self.tool_home() {
            Some(home) => println!("  Runtime archive: FOUND in {}", home.display()),
            None => println!("  Runtime archive: NOT FOUND ({})", self.archive_name()),
        }
    }
}

fn default_runtime_version() -> Version {
    Version::parse(DEFAULT_RUNTIME_VERSION).unwrap_or_else(|_| Version::new(1, 8, 0))
}

/// Explicit home first, then the executable's directory, then the user data dir.
fn default_tool_homes(explicit: Option<PathBuf>) -> Vec<PathBuf> {
    let mut homes = Vec::new();
    if let Some(home) = explicit {
        homes.push(home);
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.canonicalize().ok())
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        homes.push(exe_dir);
    }
    if let Some(data) = dirs::data_dir() {
        homes.push(data.join("pkg-lumo"));
    }
    homes
}

fn parse_jobs(value: &str) -> Result<usize> {
    let jobs: usize = value
        .trim()
        .parse()
        .with_context(|| format!("PKG_LUMO_JOBS={} is not a number", value))?;
    if jobs == 0 {
        bail!("PKG_LUMO_JOBS must be at least 1");
    }
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.runtime_version.to_string(), "1.8.0-beta");
        assert_eq!(config.work_tree_name(), "lumo-1.8.0-beta");
        assert_eq!(config.archive_name(), "lumo-1.8.0-beta.zip");
        assert_eq!(config.patch_dir_name(), "patch-1.8.0-beta");
        assert_eq!(config.output_name, "my-lumo");
        assert_eq!(config.jobs, 8);
        assert_eq!(config.patch_policy, PatchPolicy::Continue);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PKG_LUMO_HOME", "/opt/pkg-lumo"),
            ("PKG_LUMO_RUNTIME_VERSION", "1.9.0-alpha"),
            ("PKG_LUMO_JOBS", "2"),
            ("PKG_LUMO_PATCH_POLICY", "abort"),
            ("PKG_LUMO_NPM", "/usr/local/bin/npm"),
        ]))
        .unwrap();
        assert_eq!(config.tool_homes[0], PathBuf::from("/opt/pkg-lumo"));
        assert_eq!(config.work_tree_name(), "lumo-1.9.0-alpha");
        assert_eq!(config.jobs, 2);
        assert_eq!(config.patch_policy, PatchPolicy::Abort);
        assert_eq!(config.npm, "/usr/local/bin/npm");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_lookup(lookup(&[("PKG_LUMO_RUNTIME_VERSION", "one")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PKG_LUMO_JOBS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PKG_LUMO_PATCH_POLICY", "maybe")])).is_err());
    }

    #[test]
    fn test_tool_home_finds_archive() {
        let temp = tempfile::tempdir().unwrap();
        let empty = temp.path().join("empty");
        let home = temp.path().join("home");
        std::fs::create_dir_all(&empty).unwrap();
        std::fs::create_dir_all(&home).unwrap();
        std::fs::write(home.join("lumo-1.8.0-beta.zip"), b"zip").unwrap();

        let config = Config {
            tool_homes: vec![empty, home.clone()],
            ..Config::default()
        };
        assert_eq!(config.tool_home(), Some(home.as_path()));
        assert_eq!(config.patch_dir(), Some(home.join("patch-1.8.0-beta")));
    }
}
