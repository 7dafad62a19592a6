// src/experiment/config.rs

//! Experiment configuration (YAML).
//!
//! ```yaml
//! name: plasbin_default
//! tool:
//!   arguments:
//!     graph: [unicycler, asm_default]
//!   options: ["--min-length", "1000"]
//! slurm:
//!   - --mem=16G
//!   - --cpus-per-task=4
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{BenchError, Result};
use crate::fs::{FileSystem, ops};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    pub name: String,
    #[serde(default)]
    pub tool: ToolConfig,
    /// Extra `#SBATCH` directives, e.g. `--mem=16G`.
    #[serde(default)]
    pub slurm: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    #[serde(default)]
    pub arguments: BTreeMap<String, Argument>,
    /// Passed verbatim to the tool as `USER_TOOL_OPTIONS`.
    #[serde(default)]
    pub options: Vec<String>,
}

/// Upstream tool and experiment feeding one argument; `[tool, experiment]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument(pub String, pub String);

impl Argument {
    pub fn new(tool: impl Into<String>, experiment: impl Into<String>) -> Self {
        Self(tool.into(), experiment.into())
    }

    pub fn tool_name(&self) -> &str {
        &self.0
    }

    pub fn experiment_name(&self) -> &str {
        &self.1
    }
}

impl ExperimentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tool: ToolConfig::default(),
            slurm: Vec::new(),
        }
    }

    /// Read and parse a config file. Any parse failure is a syntax error.
    pub fn read(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let syntax = |reason: String| BenchError::ConfigSyntax {
            path: path.to_path_buf(),
            reason,
        };
        let contents = fs.read_to_string(path).map_err(|e| syntax(format!("{e:#}")))?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|e| syntax(e.to_string()))?;
        if config.name.trim().is_empty() {
            return Err(syntax("experiment name is empty".to_string()));
        }
        Ok(config)
    }

    /// Canonical serialized form; two configs describe the same experiment
    /// iff these are byte-equal.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        ops::write_file(path, self.to_yaml()?)?;
        Ok(())
    }

    pub fn is_same_experiment(&self, other: &Self) -> Result<bool> {
        Ok(self.to_yaml()? == other.to_yaml()?)
    }
}
