// src/script/command.rs

//! The per-task command script.
//!
//! Run by every array task: resolves the task's sample from the manifest
//! line `SLURM_ARRAY_TASK_ID`, exports the sample variables, then the
//! argument variables, then runs the tool.

use crate::connector::ToolScriptLines;
use crate::experiment::config::ExperimentConfig;
use crate::experiment::layout::ExperimentLayout;
use crate::samples::ManifestColumns;
use crate::script::shell;

pub const SAMPLES_TSV_VAR: &str = "SAMPLES_TSV";
pub const SPECIES_ID_VAR: &str = "SPECIES_ID";
pub const SAMPLE_ID_VAR: &str = "SAMPLE_ID";
pub const SPECIES_SAMPLE_ID_VAR: &str = "SPECIES_SAMPLE_ID";
pub const WORK_EXP_SAMPLE_DIR_VAR: &str = "WORK_EXP_SAMPLE_DIR";
pub const USER_TOOL_OPTIONS_VAR: &str = "USER_TOOL_OPTIONS";

pub fn command_script(
    data: &ExperimentLayout,
    work: &ExperimentLayout,
    columns: ManifestColumns,
    config: &ExperimentConfig,
    tool_lines: &ToolScriptLines,
) -> String {
    let mut lines = vec![
        shell::SHEBANG.to_string(),
        String::new(),
        "set -e".to_string(),
        "set -o pipefail".to_string(),
        String::new(),
    ];
    lines.extend(sample_lines(data, work, columns));
    lines.push(shell::array(USER_TOOL_OPTIONS_VAR, &config.tool.options));
    lines.push(String::new());
    if !tool_lines.arguments.is_empty() {
        lines.extend(tool_lines.arguments.iter().cloned());
        lines.push(String::new());
    }
    lines.extend(tool_lines.core.iter().cloned());

    let mut script = lines.join("\n");
    script.push('\n');
    script
}

fn sample_lines(data: &ExperimentLayout, work: &ExperimentLayout, columns: ManifestColumns) -> Vec<String> {
    let field = |var: &str, col: usize| {
        format!(
            "{var}=$(sed -n \"${{SLURM_ARRAY_TASK_ID}}p\" \"${{{SAMPLES_TSV_VAR}}}\" | cut -f{})",
            col + 1
        )
    };
    vec![
        format!("{SAMPLES_TSV_VAR}={}", shell::quote_path(&data.samples_tsv())),
        field(SPECIES_ID_VAR, columns.species_id),
        field(SAMPLE_ID_VAR, columns.sample_id),
        // Split from the assignments so a failing `sed` still trips `set -e`.
        format!("export {SPECIES_ID_VAR} {SAMPLE_ID_VAR}"),
        format!("export {SPECIES_SAMPLE_ID_VAR}=\"${{{SPECIES_ID_VAR}}}_${{{SAMPLE_ID_VAR}}}\""),
        format!(
            "export {WORK_EXP_SAMPLE_DIR_VAR}={}/\"${{{SPECIES_SAMPLE_ID_VAR}}}\"",
            shell::quote_path(&work.exp_dir())
        ),
        format!("mkdir -p \"${{{WORK_EXP_SAMPLE_DIR_VAR}}}\""),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ToolDescription, TopicDescription};

    fn layouts() -> (ExperimentLayout, ExperimentLayout) {
        let tool = ToolDescription::new("unicycler", "uni", TopicDescription::new("assembly", "asm"));
        (
            ExperimentLayout::data("/d", tool.clone(), "e"),
            ExperimentLayout::work("/w", tool, "e"),
        )
    }

    #[test]
    fn script_reads_the_task_line_of_the_manifest() {
        let (data, work) = layouts();
        let mut config = ExperimentConfig::new("e");
        config.tool.options = vec!["--mode".into(), "bold".into()];
        let tool_lines = ToolScriptLines {
            arguments: vec!["FASTA='/x'".into()],
            core: vec!["unicycler -o \"$WORK_EXP_SAMPLE_DIR\"".into()],
        };

        let script = command_script(&data, &work, ManifestColumns { species_id: 1, sample_id: 0 }, &config, &tool_lines);

        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains("set -e\nset -o pipefail\n"));
        assert!(script.contains("SAMPLES_TSV='/d/samples.tsv'"));
        assert!(script.contains(r#"SPECIES_ID=$(sed -n "${SLURM_ARRAY_TASK_ID}p" "${SAMPLES_TSV}" | cut -f2)"#));
        assert!(script.contains(r#"SAMPLE_ID=$(sed -n "${SLURM_ARRAY_TASK_ID}p" "${SAMPLES_TSV}" | cut -f1)"#));
        assert!(script.contains("export SPECIES_ID SAMPLE_ID\n"));
        assert!(script.contains(r#"export WORK_EXP_SAMPLE_DIR='/w/assembly/unicycler/e'/"${SPECIES_SAMPLE_ID}""#));
        assert!(script.contains("USER_TOOL_OPTIONS=('--mode' 'bold')"));

        let args = script.find("FASTA=").unwrap();
        let core = script.find("unicycler -o").unwrap();
        assert!(args < core);
    }
}
