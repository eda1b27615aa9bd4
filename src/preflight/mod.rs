//! Preflight checks for pkg-lumo builds.
//!
//! Validates host tools and the tool installation before starting a build.
//! Run with `pkg-lumo preflight` to check everything is ready.

mod host_tools;
pub mod installation;
mod types;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::platform::Platform;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(config: &Config, platform: Platform) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking host tools...");
    checks.extend(host_tools::check_host_tools(config, platform));

    println!("Checking pkg-lumo installation...");
    checks.extend(installation::check_installation(config));

    println!();

    PreflightReport { checks }
}

/// Run preflight, print the report, and bail on failures when `strict`.
pub fn run_preflight_or_fail(config: &Config, platform: Platform, strict: bool) -> Result<()> {
    let report = run_preflight(config, platform);
    report.print();

    if !report.all_passed() {
        if strict {
            bail!(
                "Preflight failed: {} check(s) failed. Fix the issues above before building.",
                report.fail_count()
            );
        }
        println!("Preflight found problems; the build may fail.\n");
        return Ok(());
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
