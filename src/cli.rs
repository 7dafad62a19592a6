// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_SETTINGS_FILE;

/// Command-line arguments for `slurmbench`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "slurmbench",
    version,
    about = "Run benchmark tools per sample as SLURM array jobs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the settings file (TOML) declaring topics and tools.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SETTINGS_FILE, global = true)]
    pub settings: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SLURMBENCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run an experiment on every sample that is not done yet.
    Run {
        /// Tool command name (see `slurmbench tools`).
        tool: String,
        /// Durable data directory holding `samples.tsv`.
        data_dir: PathBuf,
        /// Scratch directory for scripts and scheduler logs.
        work_dir: PathBuf,
        /// Experiment config (YAML).
        config: PathBuf,
    },

    /// Print the per-status sample summary of an experiment.
    Status {
        tool: String,
        data_dir: PathBuf,
        experiment: String,
    },

    /// Write a template experiment config for a tool.
    DraftConfig {
        tool: String,
        experiment: String,
        output: PathBuf,
    },

    /// List the tools declared in the settings file.
    Tools,
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
