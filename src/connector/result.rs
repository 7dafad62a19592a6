// src/connector/result.rs

//! Checkable upstream results.

use std::path::PathBuf;

use crate::experiment::layout::ExperimentLayout;
use crate::fs::FileSystem;
use crate::samples::{MissingInput, Sample, SampleStatus, status};
use crate::types::ToolDescription;

/// An input bound to an upstream experiment's data layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    /// The upstream tool's native output, checked through the sample status.
    Original { kind: String, layout: ExperimentLayout },
    /// A file converted from the upstream output into this engine's own
    /// shape, stored in the upstream sample directory.
    Formatted {
        kind: String,
        layout: ExperimentLayout,
        file: String,
    },
}

impl ToolResult {
    pub fn kind(&self) -> &str {
        match self {
            ToolResult::Original { kind, .. } | ToolResult::Formatted { kind, .. } => kind,
        }
    }

    pub fn layout(&self) -> &ExperimentLayout {
        match self {
            ToolResult::Original { layout, .. } | ToolResult::Formatted { layout, .. } => layout,
        }
    }

    pub fn tool(&self) -> &ToolDescription {
        self.layout().tool()
    }

    pub fn experiment_name(&self) -> &str {
        self.layout().experiment_name()
    }

    /// Location of the input for `sample`: the upstream sample directory, or
    /// the converted file inside it.
    pub fn path(&self, sample: &Sample) -> PathBuf {
        let dir = self.layout().sample_dir(sample);
        match self {
            ToolResult::Original { .. } => dir,
            ToolResult::Formatted { file, .. } => dir.join(file),
        }
    }

    /// Whether the input is usable for `sample`.
    pub fn check(&self, fs: &dyn FileSystem, sample: &Sample) -> SampleStatus {
        let upstream = status(fs, &self.layout().sample_dir(sample));
        match self {
            ToolResult::Original { .. } => upstream,
            ToolResult::Formatted { .. } if !upstream.is_ok() => upstream,
            ToolResult::Formatted { .. } => {
                if fs.is_file(&self.path(sample)) {
                    SampleStatus::Ok
                } else {
                    SampleStatus::NotRun
                }
            }
        }
    }

    /// Command to run to produce the result.
    pub fn help_command(&self) -> String {
        format!("slurmbench run {} --help", self.tool().cmd())
    }

    pub fn missing_input(&self, arg_name: &str, reason: SampleStatus) -> MissingInput {
        MissingInput {
            arg_name: arg_name.to_string(),
            input_topic: self.tool().topic().name().to_string(),
            input_tool: self.tool().name().to_string(),
            input_experiment: self.experiment_name().to_string(),
            reason,
            help: self.help_command(),
        }
    }
}
