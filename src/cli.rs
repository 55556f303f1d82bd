// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `stagedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stagedag",
    version,
    about = "Run a batch pipeline of dependent stages, one at a time.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML).
    ///
    /// Default: `Stagedag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Stagedag.toml")]
    pub config: String,

    /// Run only up to this stage (and everything it depends on).
    ///
    /// Overrides `[pipeline].target`.
    #[arg(long, value_name = "NAME")]
    pub target: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STAGEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved order and commands, but don't run
    /// or create anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Write a PBS submission script for this pipeline to PATH instead of
    /// running it.
    #[arg(long, value_name = "PATH")]
    pub pbs_script: Option<PathBuf>,
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
