// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::connector::ArgumentError;

#[derive(Error, Debug)]
pub enum BenchError {
    /// Invalid `slurmbench.toml` settings.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("no read/write access to {root:?}: {reason}")]
    Access { root: PathBuf, reason: String },

    #[error("wrong experiment config syntax in {path:?}: {reason}")]
    ConfigSyntax { path: PathBuf, reason: String },

    #[error("invalid experiment arguments: {}", join_argument_errors(.0))]
    InvalidArguments(Vec<ArgumentError>),

    #[error("experiment '{name}' already exists with a different config at {path:?}")]
    DifferentExperiment { name: String, path: PathBuf },

    #[error("missing tool environment wrapper script {0:?}")]
    MissingEnvWrapper(PathBuf),

    #[error("could not find magic comment '{marker}' in {path:?}")]
    EnvWrapperMarker { path: PathBuf, marker: &'static str },

    #[error("invalid sample manifest {path:?}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("completion polling was cancelled; submitted jobs keep running")]
    PollCancelled,

    #[error("migration to data failed for samples: {}", .0.join(", "))]
    Migration(Vec<String>),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn join_argument_errors(errors: &[ArgumentError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BenchError>;
