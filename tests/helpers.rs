//! Shared test utilities for pkg-lumo integration tests.
//!
//! External programs (npm, node, the interpreter) are replaced by small
//! shell scripts written into the test's temp dir.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use pkg_lumo::config::Config;
use pkg_lumo::options::BuildOptions;
use pkg_lumo::pipeline::patch::PATCH_FILES;
use pkg_lumo::pipeline::BuildContext;

pub const RUNTIME_ROOT: &str = "lumo-1.8.0-beta";

/// Test environment: a tool home, a project directory and a bin dir for fakes.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Holds the runtime archive and patch directory
    pub home: PathBuf,
    /// The caller's project
    pub project: PathBuf,
    /// Fake external programs
    pub bin: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let home = base.join("home");
        let project = base.join("project");
        let bin = base.join("bin");
        for dir in [&home, &project, &bin] {
            fs::create_dir_all(dir).expect("Failed to create test dir");
        }

        Self {
            _temp_dir: temp_dir,
            home,
            project,
            bin,
        }
    }

    /// Write an executable shell script into `bin/`.
    pub fn write_tool(&self, name: &str, body: &str) -> PathBuf {
        let path = self.bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod tool");
        path
    }

    /// Install fakes that behave like a working toolchain.
    pub fn install_working_tools(&self) {
        self.write_tool("npm", FAKE_NPM);
        self.write_tool("node", FAKE_NODE);
        self.write_tool("lumo", FAKE_LUMO);
    }

    /// Write `lumo-1.8.0-beta.zip` into the tool home.
    pub fn install_runtime_archive(&self) {
        let entries: Vec<(String, String)> = [
            ("", ""),
            ("package.json", "{\"name\":\"lumo-cljs\"}"),
            (
                "target/cljs/analyzer.js",
                "// Compiled by ClojureScript 1.10.238 {:static-fns true}\n",
            ),
            ("target/cljs/core.js", "// core"),
            ("target/main.js", "// snapshot entry"),
            ("target/google-closure-compiler-js.js", "// closure compiler"),
            ("scripts/package.js", "// stock package.js"),
        ]
        .iter()
        .map(|(rel, content)| (format!("{}/{}", RUNTIME_ROOT, rel), content.to_string()))
        .collect();
        make_zip(&self.home.join(format!("{}.zip", RUNTIME_ROOT)), &entries);
    }

    /// Write the patch directory, leaving out `missing`.
    pub fn install_patches(&self, missing: &[&str]) {
        let dir = self.home.join("patch-1.8.0-beta");
        fs::create_dir_all(&dir).expect("Failed to create patch dir");
        for name in PATCH_FILES {
            if !missing.contains(&name) {
                fs::write(dir.join(name), format!("// patched {}", name))
                    .expect("Failed to write patch");
            }
        }
    }

    /// A project with its own node_modules and a resource directory.
    pub fn create_project(&self) {
        fs::write(self.project.join("package.json"), "{\"dependencies\":{}}").unwrap();
        fs::create_dir_all(self.project.join("node_modules/original")).unwrap();
        fs::write(self.project.join("node_modules/original/index.js"), "original").unwrap();
        fs::create_dir_all(self.project.join("assets")).unwrap();
        fs::write(self.project.join("assets/logo.txt"), "logo ".repeat(100)).unwrap();
        fs::create_dir_all(self.project.join("src/my")).unwrap();
        fs::write(self.project.join("src/my/app.cljs"), "(ns my.app)").unwrap();
    }

    pub fn config(&self) -> Config {
        Config {
            tool_homes: vec![self.home.clone()],
            npm: self.tool("npm"),
            node: self.tool("node"),
            interpreter: self.tool("lumo"),
            ..Config::default()
        }
    }

    pub fn tool(&self, name: &str) -> String {
        self.bin.join(name).to_string_lossy().into_owned()
    }

    pub fn build_context(&self) -> BuildContext {
        let options = BuildOptions::from_input("src", "assets::missing", "my.app");
        BuildContext::new(&self.project, options, self.config())
    }

    pub fn work_tree(&self) -> PathBuf {
        self.project.join(RUNTIME_ROOT)
    }
}

/// Build a zip archive from (name, content) pairs; names ending in '/' are dirs.
pub fn make_zip(path: &Path, entries: &[(String, String)]) {
    let file = fs::File::create(path).expect("Failed to create zip");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);
    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(name.as_str(), options).unwrap();
        } else {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// `npm install` is a no-op; `npm install --production` installs one package.
pub const FAKE_NPM: &str = r#"
if [ "$1" = install ] && [ "$2" = --production ]; then
  mkdir -p node_modules/left-pad
  echo "module.exports = 1;" > node_modules/left-pad/index.js
fi
exit 0
"#;

/// Bundler and two-phase packaging driver.
pub const FAKE_NODE: &str = r#"
case "$1" in
  scripts/pkg-bundle.js)
    echo "// bundle" > target/bundle.min.js
    ;;
  scripts/package.js)
    case "$2" in
      prepare)
        mkdir -p tmp/9.11.2/lib/internal/modules/cjs
        echo "// stock loader" > tmp/9.11.2/lib/internal/modules/cjs/loader.js
        cat > tmp/9.11.2/node.gyp <<'GYP'
{
  'variables': {
    'library_files': [
      'lib/internal/modules/cjs/loader.js',
      'deps/node-inspect/lib/internal/inspect_repl.js',
    ],
  },
}
GYP
        ;;
      build)
        mkdir -p build
        cat tmp/9.11.2/lib/pkg_lumo_embedded.js tmp/9.11.2/node.gyp > build/lumo
        ;;
    esac
    ;;
esac
exit 0
"#;

/// Reports the right version and "compiles" into target/aot.
pub const FAKE_LUMO: &str = r#"
if [ "$1" = --version ]; then
  echo "1.8.0-beta"
  exit 0
fi
mkdir -p lumo-1.8.0-beta/target/aot
echo "// compiled my.app" > lumo-1.8.0-beta/target/aot/my.app.js
echo "{:my.app true}" > lumo-1.8.0-beta/target/aot.edn
echo ok > lumo-1.8.0-beta/.aot-ok
exit 0
"#;
