//! Preflight command - runs preflight checks.

use anyhow::Result;

use crate::config::Config;
use crate::platform::Platform;
use crate::preflight;

/// Execute the preflight command.
pub fn cmd_preflight(config: &Config, strict: bool) -> Result<()> {
    preflight::run_preflight_or_fail(config, Platform::host(), strict)?;
    if !strict {
        println!("Use --strict to turn failures into an error.");
    }
    Ok(())
}
