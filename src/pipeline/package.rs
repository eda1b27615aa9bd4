//! Native packaging: drive the toolchain in two phases with the build
//! overrides applied in between.
//!
//! ```text
//! node scripts/package.js prepare <spec>   -> <work>/tmp/<node-version>/
//! overrides::execute(<work>/tmp/<node-version>, build_overrides(..))
//! node scripts/package.js build <spec>     -> <work>/build/lumo[.exe]
//! ```

use serde::Serialize;
use tracing::info;

use super::context::BuildContext;
use super::resources::ResourceManifest;
use crate::error::PackagingError;
use crate::overrides::{self, BuildOverride};
use crate::process::Cmd;

/// Toolchain-relative module loader replaced by the embedded-resource aware one.
pub const MODULE_LOADER: &str = "lib/internal/modules/cjs/loader.js";
/// Where the toolchain's own loader is kept; the replacement delegates to it.
pub const STOCK_LOADER: &str = "lib/internal/modules/cjs/pkg_lumo_stock_loader.js";
pub const BUILD_DESCRIPTOR: &str = "node.gyp";
pub const CLOSURE_COMPILER: &str = "google-closure-compiler-js.js";
pub const EMBEDDED_MODULE: &str = "lib/pkg_lumo_embedded.js";

const INSPECTOR_ANCHOR: &str = "'deps/node-inspect/lib/internal/inspect_repl.js',";
const LOADER_ANCHOR: &str = "'lib/internal/modules/cjs/loader.js',";

/// Configuration handed to `scripts/package.js`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    pub input: String,
    pub output: String,
    pub node_temp_dir: &'static str,
    pub node_configure_args: Vec<&'static str>,
    pub node_make_args: Vec<String>,
    #[serde(rename = "nodeVCBuildArgs")]
    pub node_vc_build_args: Vec<&'static str>,
    pub flags: bool,
    pub startup_snapshot: &'static str,
    pub no_bundle: bool,
    pub framework: &'static str,
    pub node_version: String,
}

impl PackageSpec {
    pub fn for_context(ctx: &BuildContext) -> Self {
        Self {
            input: "target/bundle.min.js".to_string(),
            output: ctx.build_output_rel(),
            node_temp_dir: "tmp",
            node_configure_args: vec![
                "--without-dtrace",
                "--without-npm",
                "--without-inspector",
                "--without-etw",
                "--without-perfctr",
                "--with-snapshot",
            ],
            node_make_args: vec!["-j".to_string(), ctx.config.jobs.to_string()],
            node_vc_build_args: vec!["nosign", "x64", "noetw", "noperfctr"],
            flags: true,
            startup_snapshot: "target/main.js",
            no_bundle: true,
            framework: "node",
            node_version: ctx.config.node_version.clone(),
        }
    }
}

/// The edits made to the toolchain source tree, in application order.
pub fn build_overrides(
    ctx: &BuildContext,
    manifest: &ResourceManifest,
) -> Result<Vec<BuildOverride>, PackagingError> {
    let embedded = manifest.to_embedded_module()?;
    Ok(vec![
        BuildOverride::preserve(
            "keep-stock-loader",
            STOCK_LOADER,
            ctx.toolchain_dir().join(MODULE_LOADER),
        ),
        BuildOverride::splice_after(
            "register-stock-loader",
            BUILD_DESCRIPTOR,
            LOADER_ANCHOR,
            &format!("\n      '{}',", STOCK_LOADER),
            &format!("'{}'", STOCK_LOADER),
        ),
        BuildOverride::copy_from(
            "replace-module-loader",
            MODULE_LOADER,
            ctx.scripts_dir().join("requirePatch.js"),
        ),
        BuildOverride::copy_from(
            "copy-closure-compiler",
            CLOSURE_COMPILER,
            ctx.target_dir().join(CLOSURE_COMPILER),
        ),
        BuildOverride::splice_after(
            "register-closure-compiler",
            BUILD_DESCRIPTOR,
            INSPECTOR_ANCHOR,
            &format!("\n      '{}',", CLOSURE_COMPILER),
            &format!("'{}'", CLOSURE_COMPILER),
        ),
        BuildOverride::write("write-embedded-resources", EMBEDDED_MODULE, embedded),
        BuildOverride::splice_after(
            "register-embedded-resources",
            BUILD_DESCRIPTOR,
            LOADER_ANCHOR,
            &format!("\n      '{}',", EMBEDDED_MODULE),
            &format!("'{}'", EMBEDDED_MODULE),
        ),
    ])
}

fn toolchain(ctx: &BuildContext, phase: &str, spec_json: &str) -> Cmd {
    Cmd::new(&ctx.config.node)
        .args(["scripts/package.js", phase, spec_json])
        .dir(&ctx.work_tree)
}

/// Run both toolchain phases. Resources must already be embedded.
pub fn run(ctx: &BuildContext) -> Result<(), PackagingError> {
    let manifest = ctx
        .resources
        .as_ref()
        .ok_or(PackagingError::ResourcesNotEmbedded)?;
    let spec_json = serde_json::to_string(&PackageSpec::for_context(ctx))?;

    info!("Preparing native toolchain sources (node {})", ctx.config.node_version);
    toolchain(ctx, "prepare", &spec_json)
        .error_msg("Toolchain prepare step failed")
        .run_interactive()
        .map_err(PackagingError::Prepare)?;

    let toolchain_dir = ctx.toolchain_dir();
    if !toolchain_dir.is_dir() {
        return Err(PackagingError::MissingToolchainDir(toolchain_dir));
    }

    let overrides = build_overrides(ctx, manifest)?;
    overrides::execute(&toolchain_dir, &overrides)?;

    info!("Generating the native executable, this may take a while and consume a lot of memory.");
    toolchain(ctx, "build", &spec_json)
        .error_msg("Native build failed")
        .run_interactive()
        .map_err(PackagingError::Build)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::options::BuildOptions;
    use crate::overrides::{OverrideOp, OverrideOutcome};
    use crate::platform::Platform;
    use std::fs;
    use std::path::Path;

    const GYP: &str = "{\n  'variables': {\n    'library_files': [\n      'lib/internal/modules/cjs/loader.js',\n      'deps/node-inspect/lib/internal/inspect_repl.js',\n    ],\n  },\n}\n";

    fn context(project: &Path) -> BuildContext {
        BuildContext::new(
            project,
            BuildOptions::from_input("src", "", "my.app"),
            Config::default(),
        )
    }

    #[test]
    fn test_spec_shape() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path()).with_platform(Platform::Windows);
        let json = serde_json::to_value(PackageSpec::for_context(&ctx)).unwrap();
        assert_eq!(json["input"], "target/bundle.min.js");
        assert_eq!(json["output"], "build/lumo.exe");
        assert_eq!(json["nodeTempDir"], "tmp");
        assert_eq!(json["nodeMakeArgs"], serde_json::json!(["-j", "8"]));
        assert_eq!(json["nodeVCBuildArgs"][0], "nosign");
        assert_eq!(json["startupSnapshot"], "target/main.js");
        assert_eq!(json["noBundle"], true);
        assert_eq!(json["nodeVersion"], "9.11.2");
        assert_eq!(json["nodeConfigureArgs"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_override_order() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path());
        let overrides = build_overrides(&ctx, &ResourceManifest::default()).unwrap();
        let names: Vec<_> = overrides.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "keep-stock-loader",
                "register-stock-loader",
                "replace-module-loader",
                "copy-closure-compiler",
                "register-closure-compiler",
                "write-embedded-resources",
                "register-embedded-resources",
            ]
        );
        assert!(matches!(&overrides[0].op, OverrideOp::Preserve(p) if p.ends_with(MODULE_LOADER)));
        assert!(matches!(&overrides[2].op, OverrideOp::CopyFrom(p) if p.ends_with("scripts/requirePatch.js")));
    }

    #[test]
    fn test_overrides_apply_to_toolchain_tree() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path());
        let toolchain = ctx.toolchain_dir();
        crate::common::write_file_with_dirs(toolchain.join(BUILD_DESCRIPTOR), GYP).unwrap();
        crate::common::write_file_with_dirs(toolchain.join(MODULE_LOADER), "// stock loader").unwrap();
        crate::common::write_file_with_dirs(ctx.scripts_dir().join("requirePatch.js"), "// patched loader")
            .unwrap();
        crate::common::write_file_with_dirs(ctx.target_dir().join(CLOSURE_COMPILER), "// gcc").unwrap();

        let overrides = build_overrides(&ctx, &ResourceManifest::default()).unwrap();
        let first = overrides::execute(&toolchain, &overrides).unwrap();
        assert!(first.iter().all(|(_, o)| *o == OverrideOutcome::Applied));

        let gyp = fs::read_to_string(toolchain.join(BUILD_DESCRIPTOR)).unwrap();
        assert!(gyp.contains(
            "'lib/internal/modules/cjs/loader.js',\n      'lib/pkg_lumo_embedded.js',"
        ));
        assert!(gyp.contains(
            "'deps/node-inspect/lib/internal/inspect_repl.js',\n      'google-closure-compiler-js.js',"
        ));
        assert!(gyp.contains(
            "'lib/internal/modules/cjs/loader.js',\n      'lib/pkg_lumo_embedded.js',\n      'lib/internal/modules/cjs/pkg_lumo_stock_loader.js',"
        ));
        assert_eq!(
            fs::read_to_string(toolchain.join(MODULE_LOADER)).unwrap(),
            "// patched loader"
        );
        assert_eq!(
            fs::read_to_string(toolchain.join(STOCK_LOADER)).unwrap(),
            "// stock loader"
        );
        assert!(toolchain.join(EMBEDDED_MODULE).is_file());

        let second = overrides::execute(&toolchain, &overrides).unwrap();
        assert!(second
            .iter()
            .all(|(_, o)| *o == OverrideOutcome::AlreadyApplied));
        assert_eq!(fs::read_to_string(toolchain.join(BUILD_DESCRIPTOR)).unwrap(), gyp);
    }

    #[test]
    fn test_requires_embedded_resources() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path());
        assert!(matches!(run(&ctx), Err(PackagingError::ResourcesNotEmbedded)));
    }
}
