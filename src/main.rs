//! pkg-lumo - package a Lumo ClojureScript application as a native binary.
//!
//! Unpacks the Lumo runtime, rebuilds its bundle around the application's
//! entry point, AOT-compiles the main namespace, embeds resources, and
//! links everything with the native toolchain.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pkg_lumo::commands;
use pkg_lumo::commands::build::BuildRequest;
use pkg_lumo::config::Config;
use pkg_lumo::options::RuntimeFlags;
use pkg_lumo::pipeline::patch::PatchPolicy;
use pkg_lumo::pipeline::Stage;
use pkg_lumo::prompts::BuildInputs;

#[derive(Parser)]
#[command(name = "pkg-lumo")]
#[command(version, about = "Package a Lumo ClojureScript application into a native executable")]
#[command(
    after_help = "QUICK START:\n  pkg-lumo preflight                        Check tools and installation\n  pkg-lumo build --classpath src --main app.core\n  pkg-lumo clean                            Recover from an interrupted build"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the native binary (prompts for missing inputs on a terminal)
    Build(BuildArgs),

    /// Remove a stale working tree and restore a stranded node_modules backup
    Clean,

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Run preflight checks (verify tools and installation before a build)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Source paths, separated by ':'
    #[arg(long)]
    classpath: Option<String>,

    /// Resource directories to embed, separated by ':'
    #[arg(long)]
    resources: Option<String>,

    /// Main namespace to AOT-compile
    #[arg(long = "main")]
    main_ns: Option<String>,

    /// Name of the produced binary (default: my-lumo)
    #[arg(short, long)]
    output: Option<String>,

    /// Parallel native build jobs
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    jobs: Option<u64>,

    /// What to do when a patch file cannot be applied: continue or abort
    #[arg(long)]
    patch_policy: Option<PatchPolicy>,

    /// Stop after this stage and keep the working tree
    #[arg(long, value_name = "STAGE")]
    stop_after: Option<Stage>,

    /// Keep the working tree after a successful build
    #[arg(long)]
    keep_work_tree: bool,

    #[command(flatten)]
    runtime: RuntimeFlagArgs,
}

/// Startup flags baked into the packaged binary.
#[derive(Args)]
#[command(next_help_heading = "Runtime flags")]
struct RuntimeFlagArgs {
    /// Start a REPL after running scripts
    #[arg(long)]
    repl: bool,

    /// Script to run at startup (repeatable)
    #[arg(long = "script", value_name = "PATH")]
    scripts: Vec<String>,

    /// Dependency to add at startup (repeatable)
    #[arg(long = "dependency", value_name = "COORD")]
    dependencies: Vec<String>,

    /// Don't throw on unrecognized options
    #[arg(long)]
    unrecognized: bool,

    /// Suppress the startup banner
    #[arg(long)]
    quiet: bool,

    /// Disable line editing
    #[arg(long)]
    dumb_terminal: bool,

    /// Print the runtime version and exit
    #[arg(long = "runtime-version")]
    print_version: bool,

    /// Print the legal notice and exit
    #[arg(long)]
    legal: bool,

    /// Verbose runtime output
    #[arg(long = "runtime-verbose")]
    runtime_verbose: bool,

    /// Compile with static dispatch
    #[arg(long)]
    static_fns: bool,

    /// Elide asserts at compile time
    #[arg(long)]
    elide_asserts: bool,

    /// Argument passed to the program (repeatable)
    #[arg(long = "arg", value_name = "ARG")]
    args: Vec<String>,
}

impl From<RuntimeFlagArgs> for RuntimeFlags {
    fn from(a: RuntimeFlagArgs) -> Self {
        Self {
            repl: a.repl,
            scripts: a.scripts,
            dependencies: a.dependencies,
            unrecognized: a.unrecognized,
            quiet: a.quiet,
            dumb_terminal: a.dumb_terminal,
            version: a.print_version,
            legal: a.legal,
            verbose: a.runtime_verbose,
            static_fns: a.static_fns,
            elide_asserts: a.elide_asserts,
            args: a.args,
        }
    }
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
    /// Show pipeline stages in order
    Stages,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    let project_dir = std::env::current_dir().context("Cannot determine current directory")?;

    match cli.command {
        Commands::Build(args) => {
            let request = BuildRequest {
                inputs: BuildInputs {
                    classpath: args.classpath,
                    resources: args.resources,
                    main: args.main_ns,
                },
                flags: args.runtime.into(),
                output_name: args.output,
                jobs: args.jobs.and_then(|j| usize::try_from(j).ok()),
                patch_policy: args.patch_policy,
                stop_after: args.stop_after,
                keep_work_tree: args.keep_work_tree,
            };
            commands::cmd_build(&project_dir, request, config)?;
        }

        Commands::Clean => {
            commands::cmd_clean(&project_dir, &config)?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Stages => commands::show::ShowTarget::Stages,
            };
            commands::cmd_show(&project_dir, show_target, &config)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&config, strict)?;
        }
    }

    Ok(())
}
