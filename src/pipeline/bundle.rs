//! Module bundling: stamp the compiler version, generate the entry point and
//! drive the external bundler into a single minified file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use regex::Regex;
use serde::Serialize;
use tracing::info;

use super::context::BuildContext;
use super::entry;
use crate::common::{remove_file_if_exists, write_file_with_dirs};
use crate::error::BundleError;
use crate::process::Cmd;

/// Host builtins the bundle must import at run time instead of inlining.
pub const EXTERNAL_MODULES: &[&str] = &[
    "google-closure-compiler-js",
    "assert",
    "crypto",
    "fs",
    "module",
    "net",
    "os",
    "path",
    "readline",
    "repl",
    "stream",
    "tty",
    "v8",
    "vm",
    "zlib",
];

/// Dependencies that ship CommonJS and need interop.
pub const COMMONJS_PACKAGES: &[&str] = &["posix-getopt", "paredit.js", "jszip", "pako"];

/// Generated source whose first line names the ClojureScript compiler version.
const ANALYZER_SOURCE: &str = "target/cljs/analyzer.js";
const VERSION_STAMP: &str = "target/clojurescript-version";

/// Bundler configuration handed to `scripts/pkg-bundle.js`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSpec {
    pub input: String,
    pub output: String,
    pub format: &'static str,
    pub external: Vec<&'static str>,
    pub replace: BTreeMap<String, String>,
    pub resolve: ResolveOptions,
    pub commonjs_include: Vec<&'static str>,
    pub minify: MinifyOptions,
    pub intro: &'static str,
    pub outro: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOptions {
    pub jsnext: bool,
    pub main: bool,
    pub prefer_builtins: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinifyOptions {
    pub comments: bool,
    pub remove_console: bool,
    pub remove_debugger: bool,
}

impl BundleSpec {
    pub fn new(runtime_version: &str) -> Self {
        let mut replace = BTreeMap::new();
        // Values are substituted as source text, hence the inner quotes.
        replace.insert(
            "process.env.NODE_ENV".to_string(),
            "\"production\"".to_string(),
        );
        replace.insert(
            "process.env.LUMO_VERSION".to_string(),
            format!("\"{}\"", runtime_version),
        );

        Self {
            input: "src/js/pkg.js".to_string(),
            output: "target/bundle.min.js".to_string(),
            format: "cjs",
            external: EXTERNAL_MODULES.to_vec(),
            replace,
            resolve: ResolveOptions {
                jsnext: true,
                main: true,
                prefer_builtins: true,
            },
            commonjs_include: COMMONJS_PACKAGES.to_vec(),
            minify: MinifyOptions {
                comments: false,
                remove_console: true,
                remove_debugger: true,
            },
            intro: ";(function(){\n\"use strict\";",
            outro: "})();",
        }
    }
}

/// Produce `target/bundle.min.js` inside the working tree.
pub fn run(ctx: &BuildContext) -> Result<(), BundleError> {
    let target = ctx.target_dir();
    remove_file_if_exists(&target.join("bundle.min.js"))?;
    remove_file_if_exists(&target.join("bundle.js"))?;

    let version = stamp_compiler_version(&ctx.work_tree)?;
    info!("ClojureScript compiler version {}", version);

    entry::write(&ctx.entry_point(), &ctx.options)?;

    let spec = BundleSpec::new(&ctx.config.runtime_version.to_string());
    let spec_json = serde_json::to_string(&spec)?;

    info!("Bundling runtime and entry point...");
    Cmd::new(&ctx.config.node)
        .arg("scripts/pkg-bundle.js")
        .arg(spec_json)
        .dir(&ctx.work_tree)
        .error_msg("Bundler exited with an error")
        .run_interactive()
        .map_err(BundleError::Bundler)?;

    let bundle = ctx.bundle_file();
    if !bundle.is_file() {
        return Err(BundleError::MissingOutput(bundle));
    }
    Ok(())
}

/// Read the compiler version from the analyzer's header line and write it
/// to `target/clojurescript-version`.
pub fn stamp_compiler_version(work_tree: &Path) -> Result<String, BundleError> {
    let source = work_tree.join(ANALYZER_SOURCE);
    let read_err = |source_err| BundleError::VersionSource {
        path: source.clone(),
        source: source_err,
    };

    let file = File::open(&source).map_err(read_err)?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).map_err(read_err)?;

    let version = parse_compiler_version(&line).ok_or_else(|| BundleError::VersionPattern {
        path: source.clone(),
        line: line.trim_end().to_string(),
    })?;

    write_file_with_dirs(work_tree.join(VERSION_STAMP), &version)?;
    Ok(version)
}

/// `ClojureScript 1.10.238` -> `1.10.238`.
pub fn parse_compiler_version(line: &str) -> Option<String> {
    let re = Regex::new(r"ClojureScript\s([0-9.]+)").ok()?;
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
