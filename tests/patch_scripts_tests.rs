//! The override scripts shipped in `patch-<version>/` against the contract
//! the pipeline drives them with.

use std::fs;
use std::path::PathBuf;

use pkg_lumo::config::Config;
use pkg_lumo::pipeline::package::{EMBEDDED_MODULE, STOCK_LOADER};
use pkg_lumo::pipeline::patch::{PATCH_FILES, PATCH_PROTOCOL};
use pkg_lumo::preflight::installation::check_installation;
use pkg_lumo::preflight::CheckStatus;

fn shipped_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(Config::default().patch_dir_name())
}

fn script(name: &str) -> String {
    fs::read_to_string(shipped_dir().join(name)).unwrap()
}

#[test]
fn test_every_patch_file_is_shipped_with_protocol_tag() {
    for name in PATCH_FILES {
        let text = script(name);
        let first = text.lines().next().unwrap_or_default();
        assert!(first.contains(PATCH_PROTOCOL), "{} lacks the protocol tag", name);
    }
}

#[test]
fn test_shipped_scripts_pass_preflight() {
    let config = Config {
        tool_homes: vec![PathBuf::from(env!("CARGO_MANIFEST_DIR"))],
        ..Config::default()
    };
    let results = check_installation(&config);
    let protocol = results.iter().find(|r| r.name == "patch protocol").unwrap();
    assert_eq!(protocol.status, CheckStatus::Pass);
    let patches = results
        .iter()
        .find(|r| r.name == config.patch_dir_name())
        .unwrap();
    assert_eq!(patches.status, CheckStatus::Pass);
}

#[test]
fn test_bundler_leaves_entry_point_alone() {
    let text = script("pkg-bundle.js");
    assert!(!text.contains("writeFileSync"));
    assert!(text.contains("spec.input"));
    assert!(text.contains("spec.commonjsInclude"));
}

#[test]
fn test_packager_runs_two_phases_without_compressing() {
    let text = script("package.js");
    assert!(text.contains("'prepare'"));
    assert!(text.contains("'build'"));
    assert!(!text.contains("deflate"));
    assert!(text.contains("spec.nodeVCBuildArgs"));
}

#[test]
fn test_loader_and_embed_agree_on_toolchain_paths() {
    let embed = script("embed.js");
    assert!(embed.contains(&format!("'{}'", EMBEDDED_MODULE)));
    assert!(embed.contains(&format!("'{}'", STOCK_LOADER)));

    let loader = script("requirePatch.js");
    let stock_id = STOCK_LOADER
        .trim_start_matches("lib/")
        .trim_end_matches(".js");
    assert!(loader.contains(&format!("require('{}')", stock_id)));
    assert!(loader.contains("require('pkg_lumo_embedded')"));
}
