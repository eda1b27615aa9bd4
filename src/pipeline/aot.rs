//! Ahead-of-time compilation of the user's main namespace.
//!
//! The interpreter is run with the AOT cache pointed at `target/aot`. The
//! evaluated expression writes a marker file only after `require` returns,
//! so a zero exit status alone is not taken as success.

use std::path::{Path, PathBuf};

use semver::Version;
use tracing::{debug, info};

use super::context::BuildContext;
use crate::common::{ensure_dir, remove_file_if_exists};
use crate::error::AotCompileError;
use crate::platform::Platform;
use crate::process::Cmd;
use crate::version;

/// npm package that ships the interpreter.
pub const INTERPRETER_PACKAGE: &str = "lumo-cljs";
/// Install prefix for a locally installed interpreter, inside the working tree.
pub const TOOLS_DIR: &str = ".aot-tools";
/// Written by the interpreter once the main namespace has loaded.
pub const SUCCESS_MARKER: &str = ".aot-ok";

const FORBIDDEN_NS_CHARS: &[char] = &[
    '"', '\'', '(', ')', '[', ']', '{', '}', ';', '`', '~', '@', '^', '\\',
];

/// Reject namespace names that would break out of the evaluated expression.
pub fn validate_namespace(ns: &str) -> Result<(), AotCompileError> {
    let invalid = ns.is_empty()
        || ns
            .chars()
            .any(|c| c.is_whitespace() || FORBIDDEN_NS_CHARS.contains(&c));
    if invalid {
        return Err(AotCompileError::InvalidNamespace(ns.to_string()));
    }
    Ok(())
}

/// The expression handed to `-e`.
pub fn eval_expression(ns: &str, marker: &Path) -> String {
    // A JSON string literal is also a valid ClojureScript string literal.
    let marker = serde_json::Value::String(marker.to_string_lossy().into_owned()).to_string();
    format!(
        "(require '{ns}) (.writeFileSync (js/require \"fs\") {marker} \"ok\") (.exit js/process 0)"
    )
}

/// Binary location after `npm install --prefix <prefix> lumo-cljs`.
pub fn local_interpreter_path(prefix: &Path, platform: Platform) -> PathBuf {
    prefix
        .join("node_modules")
        .join(INTERPRETER_PACKAGE)
        .join("bin")
        .join(platform.executable_name("lumo"))
}

/// Global interpreter if it reports exactly `required`.
fn global_interpreter(program: &str, required: &Version) -> Option<PathBuf> {
    if !crate::process::exists(program) {
        debug!("No global {} on PATH", program);
        return None;
    }
    let result = Cmd::new(program).arg("--version").allow_fail().run().ok()?;
    if !result.success() {
        debug!(
            "{} --version exited with {}: {}",
            program,
            result.code(),
            result.stderr_trimmed()
        );
        return None;
    }
    let reported = result.stdout_trimmed();
    if !version::matches(required, reported) {
        debug!(
            "Global interpreter reports {:?}, need {}",
            reported, required
        );
        return None;
    }
    Some(crate::process::which(program).unwrap_or_else(|| PathBuf::from(program)))
}

/// Find an interpreter of the runtime's version, installing one locally if needed.
pub fn resolve_interpreter(ctx: &BuildContext) -> Result<PathBuf, AotCompileError> {
    let required = &ctx.config.runtime_version;
    if let Some(path) = global_interpreter(&ctx.config.interpreter, required) {
        info!("Using global interpreter {}", path.display());
        return Ok(path);
    }

    let prefix = ctx.work_tree.join(TOOLS_DIR);
    let package = format!("{}@{}", INTERPRETER_PACKAGE, required);
    info!("Installing {} from npm...", package);
    ensure_dir(&prefix)?;
    Cmd::new(&ctx.config.npm)
        .args(["install", package.as_str(), "--no-save", "--prefix"])
        .arg_path(&prefix)
        .dir(&ctx.work_tree)
        .run_interactive()
        .map_err(|source| AotCompileError::Install {
            version: required.to_string(),
            source,
        })?;

    let binary = local_interpreter_path(&prefix, ctx.platform);
    if !binary.is_file() {
        return Err(AotCompileError::InterpreterMissing(binary));
    }
    Ok(binary)
}

/// Compile the main namespace into `target/aot` with `interpreter`.
pub fn compile(ctx: &BuildContext, interpreter: &Path) -> Result<(), AotCompileError> {
    let ns = &ctx.options.main_ns;
    validate_namespace(ns)?;

    let marker = ctx.work_tree.join(SUCCESS_MARKER);
    remove_file_if_exists(&marker)?;
    let aot_dir = ctx.aot_dir();
    ensure_dir(&aot_dir)?;

    info!("Generating AOT from main namespace: {}", ns);
    Cmd::new(interpreter)
        .args(["--quiet", "-c"])
        .arg(ctx.options.classpath_arg())
        .arg("-sdfk")
        .arg_path(&aot_dir)
        .arg("-e")
        .arg(eval_expression(ns, &marker))
        .dir(&ctx.project_dir)
        .run_interactive()
        .map_err(AotCompileError::Compile)?;

    if !marker.is_file() {
        return Err(AotCompileError::NamespaceNotLoaded(ns.clone()));
    }
    remove_file_if_exists(&marker)?;
    Ok(())
}

/// Resolve the interpreter and compile. Returns the interpreter used.
pub fn run(ctx: &BuildContext) -> Result<PathBuf, AotCompileError> {
    validate_namespace(&ctx.options.main_ns)?;
    let interpreter = resolve_interpreter(ctx)?;
    compile(ctx, &interpreter)?;
    Ok(interpreter)
}
