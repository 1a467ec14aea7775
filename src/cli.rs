// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `thunder`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "thunder",
    version,
    about = "Hot reload for compiled programs: rebuild and restart on every save.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `thunder.toml` in the current working directory.
    #[arg(long, global = true, value_name = "PATH", default_value = "thunder.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `THUNDER_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Write a starter `thunder.toml` into the current directory.
    Init,

    /// Build, run and keep rebuilding the app on every source change.
    Run {
        /// Entry-point source file; overrides `main_file` from the config.
        #[arg(value_name = "ENTRY")]
        entry: Option<String>,
    },
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
