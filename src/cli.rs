// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Compile the assets of a multi-plugin source tree in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the manifest file (TOML).
    ///
    /// Default: `Assetflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Assetflow.toml")]
    pub manifest: String,

    /// Only build these units (and everything they depend on).
    ///
    /// May be given multiple times.
    #[arg(short = 'p', long = "plugin", value_name = "NAME")]
    pub plugins: Vec<String>,

    /// Keep running and recompile units whose sources change.
    #[arg(short, long)]
    pub watch: bool,

    /// Production build: skips test assets and is forwarded to compilers.
    #[arg(short = 'P', long)]
    pub production: bool,

    /// Maximum number of concurrent compile steps.
    ///
    /// Overrides `[config].max_parallelism`. Default: available cores - 1.
    #[arg(short = 't', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Debug logging; also forwarded to compilers.
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--verbose`, `ASSETFLOW_LOG` or a default level is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print units and per-type graphs, but don't compile.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
