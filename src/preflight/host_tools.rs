//! Host tool availability checks.

use crate::config::Config;
use crate::platform::Platform;
use crate::process::{self, Cmd};
use crate::version;

use super::types::CheckResult;

/// Check the programs the pipeline shells out to.
pub fn check_host_tools(config: &Config, platform: Platform) -> Vec<CheckResult> {
    let mut results = vec![
        check_tool_exists(&config.npm, "Required to install runtime and project dependencies"),
        check_tool_exists(&config.node, "Required to run the bundler and packaging scripts"),
    ];

    if platform.is_windows() {
        results.push(CheckResult::skip("make", "Windows builds use vcbuild"));
    } else {
        results.push(check_tool_exists("make", "Required by the native toolchain"));
    }

    results.push(check_python());
    results.push(check_interpreter(config));
    results
}

fn check_tool_exists(tool: &str, purpose: &str) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, path.display().to_string()),
        None => CheckResult::fail(tool, format!("Not found. {}", purpose)),
    }
}

/// The native toolchain's configure step needs a Python interpreter.
fn check_python() -> CheckResult {
    match ["python", "python3", "python2"]
        .iter()
        .find_map(|name| process::which(name))
    {
        Some(path) => CheckResult::pass_with("python", path.display().to_string()),
        None => CheckResult::fail("python", "Not found. Required by the native toolchain's configure step"),
    }
}

/// A matching global interpreter saves a local install; its absence is only a warning.
fn check_interpreter(config: &Config) -> CheckResult {
    let name = config.interpreter.as_str();
    let Some(path) = process::which(name) else {
        return CheckResult::warn(
            name,
            format!(
                "Not installed globally; lumo-cljs@{} will be installed into the working tree",
                config.runtime_version
            ),
        );
    };

    let reported = Cmd::new(&path)
        .arg("--version")
        .allow_fail()
        .run()
        .map(|r| r.stdout_trimmed().to_string())
        .unwrap_or_default();

    if version::matches(&config.runtime_version, &reported) {
        CheckResult::pass_with(name, format!("{} ({})", path.display(), reported))
    } else {
        CheckResult::warn(
            name,
            format!(
                "Reports {:?}, need {}; a local copy will be installed",
                reported, config.runtime_version
            ),
        )
    }
}
