// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::ConfigOverride;
use crate::dag::ForceMode;

/// Command-line arguments for `fixturedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fixturedag",
    version,
    about = "Regenerate test fixtures from a rule-based workflow.",
    long_about = None
)]
pub struct CliArgs {
    /// Targets to build: rule names or output paths.
    ///
    /// Default: the workflow's `default_target` (usually `all`).
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Path to the workflow file (TOML).
    #[arg(short = 's', long, value_name = "PATH", default_value = "Fixtures.toml")]
    pub workflow: PathBuf,

    /// Working directory for paths and commands.
    ///
    /// Default: the directory containing the workflow file.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Maximum number of jobs running at the same time.
    #[arg(short = 'j', long, value_name = "N", default_value_t = 1, value_parser = parse_jobs)]
    pub jobs: usize,

    /// Print the jobs that would run and why, without executing anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// List the workflow's rules and exit.
    #[arg(long)]
    pub list: bool,

    /// Run the jobs for the requested targets even if they are up to date.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Run every job needed for the requested targets.
    #[arg(short = 'F', long, conflicts_with = "force")]
    pub forceall: bool,

    /// Stop starting new jobs after the first failure.
    #[arg(long)]
    pub fail_fast: bool,

    /// Run commands inside the rule's environment via `env_command`.
    #[arg(long)]
    pub use_envs: bool,

    /// Override a configuration value, e.g. `--config release=v1.2`.
    #[arg(short = 'C', long = "config", value_name = "KEY=VALUE")]
    pub config: Vec<ConfigOverride>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FIXTUREDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    pub fn force_mode(&self) -> ForceMode {
        if self.forceall {
            ForceMode::All
        } else if self.force {
            ForceMode::Targets
        } else {
            ForceMode::None
        }
    }
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

fn parse_jobs(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
