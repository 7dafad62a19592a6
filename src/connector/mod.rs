// src/connector/mod.rs

//! Input resolution.
//!
//! A [`Connector`] describes one runnable tool: its identity, the arguments
//! it declares (one [`ArgumentPath`] each) and the [`ToolCommands`] that
//! invoke it. The engine never knows concrete tool types; everything it
//! needs goes through these values.

pub mod argument;
pub mod result;
pub mod tools;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::errors::{BenchError, Result};
use crate::experiment::config::ExperimentConfig;
use crate::experiment::layout::ExperimentLayout;
use crate::types::ToolDescription;

pub use argument::{ArgumentCommands, ArgumentPath, ExportPath, Requirement};
pub use result::ToolResult;
pub use tools::{ProvidedTool, ToolSet};

/// Why one argument of an experiment config cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("argument '{argument}': unknown {topic} tool '{tool}' (expected one of: {})", .expected.join(", "))]
    UnknownTool {
        argument: String,
        tool: String,
        topic: String,
        expected: Vec<String>,
    },

    #[error("argument '{argument}': tool '{tool}' cannot provide a '{kind}' result")]
    UnsupportedResult {
        argument: String,
        tool: String,
        kind: String,
    },

    #[error("argument '{argument}' is missing from the config")]
    MissingArgument { argument: String },

    #[error("'{argument}' is not an argument of tool '{tool}'")]
    UnexpectedArgument { argument: String, tool: String },
}

/// Everything a tool needs to render its invocation.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub options: &'a [String],
    pub inputs: &'a BTreeMap<String, ToolResult>,
    pub data: &'a ExperimentLayout,
    pub work: &'a ExperimentLayout,
}

/// Emits the shell lines that run the concrete tool for one task.
pub trait ToolCommands: Send + Sync + Debug {
    fn core_lines(&self, ctx: &CommandContext<'_>) -> Vec<String>;
}

/// A fixed shell snippet, one line per line of text.
#[derive(Debug, Clone, Default)]
pub struct ShellSnippet(pub String);

impl ToolCommands for ShellSnippet {
    fn core_lines(&self, _ctx: &CommandContext<'_>) -> Vec<String> {
        self.0.lines().map(str::to_string).collect()
    }
}

/// Lines contributed by the tool to the command script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolScriptLines {
    pub arguments: Vec<String>,
    pub core: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Connector {
    description: ToolDescription,
    arguments: BTreeMap<String, ArgumentPath>,
    commands: Arc<dyn ToolCommands>,
}

impl Connector {
    pub fn new(description: ToolDescription, commands: Arc<dyn ToolCommands>) -> Self {
        Self {
            description,
            arguments: BTreeMap::new(),
            commands,
        }
    }

    pub fn with_argument(mut self, path: ArgumentPath) -> Self {
        self.arguments.insert(path.name().to_string(), path);
        self
    }

    pub fn description(&self) -> &ToolDescription {
        &self.description
    }

    pub fn arguments(&self) -> impl Iterator<Item = &ArgumentPath> {
        self.arguments.values()
    }

    /// Every argument problem of `config`, not only the first one.
    pub fn check_arguments_resolve(&self, config: &ExperimentConfig, data_root: &Path) -> Vec<ArgumentError> {
        let mut errors = Vec::new();
        for (name, path) in &self.arguments {
            match config.tool.arguments.get(name) {
                None => errors.push(ArgumentError::MissingArgument {
                    argument: name.clone(),
                }),
                Some(argument) => {
                    if let Err(err) = path.resolve(argument, data_root) {
                        errors.push(err);
                    }
                }
            }
        }
        for name in config.tool.arguments.keys() {
            if !self.arguments.contains_key(name) {
                errors.push(ArgumentError::UnexpectedArgument {
                    argument: name.clone(),
                    tool: self.description.name().to_string(),
                });
            }
        }
        errors
    }

    /// Resolve all arguments, failing with every error at once.
    pub fn resolve_inputs(
        &self,
        config: &ExperimentConfig,
        data_root: &Path,
    ) -> Result<BTreeMap<String, ToolResult>> {
        let errors = self.check_arguments_resolve(config, data_root);
        if !errors.is_empty() {
            return Err(BenchError::InvalidArguments(errors));
        }
        let mut inputs = BTreeMap::new();
        for (name, path) in &self.arguments {
            if let Some(argument) = config.tool.arguments.get(name) {
                let result = path
                    .resolve(argument, data_root)
                    .map_err(|e| BenchError::InvalidArguments(vec![e]))?;
                debug!(argument = %name, upstream = ?result.layout().exp_dir(), "resolved input");
                inputs.insert(name.clone(), result);
            }
        }
        Ok(inputs)
    }

    pub fn script_lines(
        &self,
        config: &ExperimentConfig,
        inputs: &BTreeMap<String, ToolResult>,
        data: &ExperimentLayout,
        work: &ExperimentLayout,
    ) -> ToolScriptLines {
        let arguments = inputs
            .iter()
            .filter_map(|(name, result)| {
                self.arguments
                    .get(name)
                    .map(|path| path.commands(result, work))
            })
            .flatten()
            .collect();
        let ctx = CommandContext {
            options: &config.tool.options,
            inputs,
            data,
            work,
        };
        ToolScriptLines {
            arguments,
            core: self.commands.core_lines(&ctx),
        }
    }

    /// A config template listing the legal tools of every argument.
    pub fn draft_config(&self, experiment: &str) -> String {
        let mut out = format!("name: {experiment}\ntool:\n");
        if self.arguments.is_empty() {
            out.push_str("  arguments: {}\n");
        } else {
            out.push_str("  arguments:\n");
            for (name, path) in &self.arguments {
                let tools: Vec<&str> = path
                    .tools()
                    .providers(path.requirement().kind())
                    .map(|t| t.description.name())
                    .collect();
                out.push_str(&format!(
                    "    {name}: [{}, $input_experiment_name]\n",
                    tools.join(" | ")
                ));
            }
        }
        out.push_str("  options: []\nslurm: []\n");
        out
    }
}
