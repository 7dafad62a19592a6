// src/connector/argument.rs

//! Per-argument resolution from `[tool, experiment]` to a [`ToolResult`].

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use crate::connector::{ArgumentError, ToolResult, ToolSet};
use crate::experiment::config::Argument;
use crate::experiment::layout::ExperimentLayout;
use crate::script::command::SPECIES_SAMPLE_ID_VAR;
use crate::script::shell;

/// The kind of input an argument expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// The upstream tool's native result of this kind.
    Original { kind: String },
    /// A file converted from the upstream result of this kind.
    Formatted { kind: String, file: String },
}

impl Requirement {
    pub fn kind(&self) -> &str {
        match self {
            Requirement::Original { kind } | Requirement::Formatted { kind, .. } => kind,
        }
    }
}

/// Emits the shell lines that hand a resolved input to the tool.
pub trait ArgumentCommands: Send + Sync + Debug {
    fn lines(&self, arg_name: &str, result: &ToolResult, work: &ExperimentLayout) -> Vec<String>;
}

/// Exports the input location of the current task's sample as an
/// upper-cased variable named after the argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportPath;

impl ArgumentCommands for ExportPath {
    fn lines(&self, arg_name: &str, result: &ToolResult, _work: &ExperimentLayout) -> Vec<String> {
        let mut value = format!(
            "{}/\"${{{SPECIES_SAMPLE_ID_VAR}}}\"",
            shell::quote_path(&result.layout().exp_dir())
        );
        if let ToolResult::Formatted { file, .. } = result {
            value.push('/');
            value.push_str(&shell::quote(file));
        }
        vec![format!("export {}={value}", shell::var_name(arg_name))]
    }
}

#[derive(Debug, Clone)]
pub struct ArgumentPath {
    name: String,
    tools: ToolSet,
    requirement: Requirement,
    commands: Arc<dyn ArgumentCommands>,
}

impl ArgumentPath {
    pub fn new(name: impl Into<String>, tools: ToolSet, requirement: Requirement) -> Self {
        Self {
            name: name.into(),
            tools,
            requirement,
            commands: Arc::new(ExportPath),
        }
    }

    pub fn with_commands(mut self, commands: Arc<dyn ArgumentCommands>) -> Self {
        self.commands = commands;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Resolve `argument` against the upstream experiment stored under
    /// `data_root`.
    pub fn resolve(&self, argument: &Argument, data_root: &Path) -> Result<ToolResult, ArgumentError> {
        let tool = self
            .tools
            .get(argument.tool_name())
            .ok_or_else(|| ArgumentError::UnknownTool {
                argument: self.name.clone(),
                tool: argument.tool_name().to_string(),
                topic: self.tools.topic().name().to_string(),
                expected: self.tools.names().map(str::to_string).collect(),
            })?;

        let kind = self.requirement.kind();
        if !tool.provides(kind) {
            return Err(ArgumentError::UnsupportedResult {
                argument: self.name.clone(),
                tool: argument.tool_name().to_string(),
                kind: kind.to_string(),
            });
        }

        let layout = ExperimentLayout::data(
            data_root,
            tool.description.clone(),
            argument.experiment_name(),
        );
        Ok(match &self.requirement {
            Requirement::Original { kind } => ToolResult::Original {
                kind: kind.clone(),
                layout,
            },
            Requirement::Formatted { kind, file } => ToolResult::Formatted {
                kind: kind.clone(),
                layout,
                file: file.clone(),
            },
        })
    }

    pub fn commands(&self, result: &ToolResult, work: &ExperimentLayout) -> Vec<String> {
        self.commands.lines(&self.name, result, work)
    }
}
