// src/samples/missing_inputs.rs

//! Per-sample `missing_inputs.tsv` ledger.

use std::path::Path;

use crate::errors::{BenchError, Result};
use crate::fs::{FileSystem, ops};
use crate::samples::SampleStatus;

const HEADER: [&str; 6] = [
    "arg_name",
    "input_topic",
    "input_tool",
    "input_experiment",
    "reason",
    "help",
];

/// One argument whose upstream result is not usable for a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingInput {
    pub arg_name: String,
    pub input_topic: String,
    pub input_tool: String,
    pub input_experiment: String,
    /// Status of the upstream sample.
    pub reason: SampleStatus,
    /// Command to run to produce the missing result.
    pub help: String,
}

impl MissingInput {
    fn to_row(&self) -> String {
        [
            self.arg_name.as_str(),
            self.input_topic.as_str(),
            self.input_tool.as_str(),
            self.input_experiment.as_str(),
            self.reason.as_str(),
            self.help.as_str(),
        ]
        .map(sanitize_field)
        .join("\t")
    }
}

/// Tabs and newlines would break the TSV framing.
fn sanitize_field(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

pub fn write_missing_inputs(path: &Path, rows: &[MissingInput]) -> Result<()> {
    let mut out = HEADER.join("\t");
    out.push('\n');
    for row in rows {
        out.push_str(&row.to_row());
        out.push('\n');
    }
    ops::write_file(path, out)?;
    Ok(())
}

pub fn read_missing_inputs(fs: &dyn FileSystem, path: &Path) -> Result<Vec<MissingInput>> {
    let contents = fs.read_to_string(path)?;
    let mut rows = Vec::new();
    for (idx, line) in contents.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let &[arg_name, topic, tool, experiment, reason, help] = fields.as_slice() else {
            return Err(BenchError::Other(anyhow::anyhow!(
                "{:?} line {}: expected {} fields, got {}",
                path,
                idx + 1,
                HEADER.len(),
                fields.len()
            )));
        };
        let reason = reason
            .parse::<SampleStatus>()
            .map_err(|e| anyhow::anyhow!("{:?} line {}: {e}", path, idx + 1))?;
        rows.push(MissingInput {
            arg_name: arg_name.to_string(),
            input_topic: topic.to_string(),
            input_tool: tool.to_string(),
            input_experiment: experiment.to_string(),
            reason,
            help: help.to_string(),
        });
    }
    Ok(rows)
}
