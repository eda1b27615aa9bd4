//! Build options supplied once at pipeline start.
//!
//! Classpath and resource directories arrive as colon-separated strings
//! and are split into ordered lists with empty segments dropped.

use std::path::PathBuf;

use serde::Serialize;

/// Interpreter flags baked into the packaged binary's startup options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeFlags {
    pub repl: bool,
    pub scripts: Vec<String>,
    pub dependencies: Vec<String>,
    pub unrecognized: bool,
    pub quiet: bool,
    pub dumb_terminal: bool,
    pub version: bool,
    pub legal: bool,
    pub verbose: bool,
    pub static_fns: bool,
    pub elide_asserts: bool,
    pub args: Vec<String>,
}

/// Immutable options for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Source roots for the user's program.
    pub classpath: Vec<String>,
    /// Directories copied into the bundle and embedded.
    pub resource_dirs: Vec<PathBuf>,
    /// Namespace required at AOT time.
    pub main_ns: String,
    pub flags: RuntimeFlags,
}

impl BuildOptions {
    /// Build options from the three raw user inputs.
    pub fn from_input(classpath: &str, resource_dirs: &str, main_ns: &str) -> Self {
        Self {
            classpath: split_path_list(classpath),
            resource_dirs: split_path_list(resource_dirs)
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            main_ns: main_ns.trim().to_string(),
            flags: RuntimeFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: RuntimeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Classpath in the form the interpreter's `-c` flag takes.
    pub fn classpath_arg(&self) -> String {
        self.classpath.join(":")
    }

    /// Startup options as the runtime engine reads them.
    pub fn runtime_options(&self) -> RuntimeOptions<'_> {
        RuntimeOptions {
            main_ns_name: &self.main_ns,
            classpath: &self.classpath,
            repl: self.flags.repl,
            scripts: &self.flags.scripts,
            dependencies: &self.flags.dependencies,
            unrecognized: self.flags.unrecognized,
            quiet: self.flags.quiet,
            dumb_terminal: self.flags.dumb_terminal,
            version: self.flags.version,
            legal: self.flags.legal,
            verbose: self.flags.verbose,
            static_fns: self.flags.static_fns,
            elide_asserts: self.flags.elide_asserts,
            args: &self.flags.args,
            cache: "aot",
        }
    }
}

/// Serialized startup options, keyed the way the runtime expects.
#[derive(Debug, Serialize)]
pub struct RuntimeOptions<'a> {
    #[serde(rename = "mainNsName")]
    pub main_ns_name: &'a str,
    pub classpath: &'a [String],
    pub repl: bool,
    pub scripts: &'a [String],
    pub dependencies: &'a [String],
    pub unrecognized: bool,
    pub quiet: bool,
    #[serde(rename = "dumb-terminal")]
    pub dumb_terminal: bool,
    pub version: bool,
    pub legal: bool,
    pub verbose: bool,
    #[serde(rename = "static-fns")]
    pub static_fns: bool,
    #[serde(rename = "elide-asserts")]
    pub elide_asserts: bool,
    pub args: &'a [String],
    /// The packaged binary always reads its compiled namespaces from the AOT cache.
    pub cache: &'static str,
}

/// Split a colon-separated list, dropping empty segments.
pub fn split_path_list(input: &str) -> Vec<String> {
    input
        .split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
