// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::types::PrepFlag;

/// Command-line arguments for `racestart`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "racestart",
    version,
    about = "Run sailing race start sequences: timed flags, sound signals and operator overrides.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Racestart.toml` in the current working directory; a missing
    /// default file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Procedure document (JSON or TOML), overriding `[procedure].path`.
    #[arg(long, value_name = "PATH")]
    pub procedure: Option<String>,

    /// Length of the standard sequence in minutes (at least 3).
    #[arg(long, value_name = "N")]
    pub minutes: Option<u32>,

    /// Preparatory flag: P, I, Z, U or BLACK.
    #[arg(long, value_name = "FLAG", value_parser = parse_prep_flag)]
    pub prep_flag: Option<PrepFlag>,

    /// Restart the sequence automatically after each start.
    #[arg(long)]
    pub auto_restart: bool,

    /// Start the sequence immediately instead of waiting for `start`.
    #[arg(long)]
    pub start: bool,

    /// Do not read operator commands from stdin.
    #[arg(long)]
    pub no_console: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RACESTART_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the resolved schedule and special nodes, then exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the active procedure document as JSON, then exit.
    #[arg(long)]
    pub emit_graph: bool,
}

fn parse_prep_flag(s: &str) -> Result<PrepFlag, String> {
    s.parse()
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
