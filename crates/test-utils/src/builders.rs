#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use slurmbench::connector::{ArgumentPath, Connector, Requirement, ShellSnippet, ToolSet};
use slurmbench::experiment::{Argument, ExperimentConfig, ExperimentLayout, RunRequest};
use slurmbench::fs::ops;
use slurmbench::samples::{Sample, samples_tsv};
use slurmbench::script::env_wrapper::{BEGIN_ENV_MARKER, END_ENV_MARKER, MID_ENV_MARKER};
use slurmbench::slurm::PollOptions;
use slurmbench::types::{ToolDescription, TopicDescription};

pub fn assembly_topic() -> TopicDescription {
    TopicDescription::new("assembly", "asm")
}

pub fn plasmidness_topic() -> TopicDescription {
    TopicDescription::new("plasmidness", "plm")
}

/// unicycler provides `fasta_gz` and `gfa_gz`; skesa only `fasta_gz`.
pub fn assemblers() -> ToolSet {
    ToolSet::new(assembly_topic())
        .with_tool("unicycler", "unicycler", ["fasta_gz", "gfa_gz"])
        .with_tool("skesa", "skesa", ["fasta_gz"])
}

pub fn unicycler() -> ToolDescription {
    ToolDescription::new("unicycler", "unicycler", assembly_topic())
}

/// Argument-less connector, e.g. an assembler reading raw reads.
pub fn unicycler_connector() -> Connector {
    Connector::new(
        unicycler(),
        Arc::new(ShellSnippet(
            "unicycler -o \"${WORK_EXP_SAMPLE_DIR}\" \"${USER_TOOL_OPTIONS[@]}\"".to_string(),
        )),
    )
}

/// Connector taking an assembly `fasta` and an assembly `graph`.
pub fn plasbin_connector() -> Connector {
    Connector::new(
        ToolDescription::new("plasbin", "plasbin", plasmidness_topic()),
        Arc::new(ShellSnippet(
            "plasbin --fasta \"${FASTA}\" --graph \"${GRAPH}\" -o \"${WORK_EXP_SAMPLE_DIR}\"".to_string(),
        )),
    )
    .with_argument(ArgumentPath::new(
        "fasta",
        assemblers(),
        Requirement::Original {
            kind: "fasta_gz".to_string(),
        },
    ))
    .with_argument(ArgumentPath::new(
        "graph",
        assemblers(),
        Requirement::Original {
            kind: "gfa_gz".to_string(),
        },
    ))
}

/// Config of `plasbin` reading both inputs from one upstream experiment.
pub fn plasbin_config(name: &str, tool: &str, experiment: &str) -> ExperimentConfig {
    let mut config = ExperimentConfig::new(name);
    for arg in ["fasta", "graph"] {
        config
            .tool
            .arguments
            .insert(arg.to_string(), Argument::new(tool, experiment));
    }
    config
}

/// `samples.tsv` with a header and one row per `(species, sample)`.
pub fn write_manifest(data_root: &Path, samples: &[(&str, &str)]) -> anyhow::Result<()> {
    let mut text = String::from("species_id\tsample_id\n");
    for (species, sample) in samples {
        text.push_str(&format!("{species}\t{sample}\n"));
    }
    ops::write_file(&samples_tsv(data_root), text)
}

/// A wrapper with all three markers around trivial setup lines.
pub fn write_env_wrapper(data: &ExperimentLayout) -> anyhow::Result<()> {
    let text = format!(
        "#!/usr/bin/env bash\n\
         {BEGIN_ENV_MARKER}\n\
         module load tool\n\
         {MID_ENV_MARKER}\n\
         module unload tool\n\
         {END_ENV_MARKER}\n"
    );
    ops::write_file(&data.env_wrapper_sh(), text)
}

/// Mark `sample` done in `layout` as if a previous run had succeeded.
pub fn mark_done(layout: &ExperimentLayout, sample: &Sample) -> anyhow::Result<()> {
    ops::write_file(&layout.done_log(sample), "done\n")
}

pub fn mark_error(layout: &ExperimentLayout, sample: &Sample) -> anyhow::Result<()> {
    ops::write_file(&layout.errors_log(sample), "boom\n")
}

/// Write `config` and return its path.
pub fn write_config(dir: &Path, config: &ExperimentConfig) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!("{}.yaml", config.name));
    ops::write_file(&path, config.to_yaml()?)?;
    Ok(path)
}

pub fn run_request(data_root: &Path, work_root: &Path, config_path: &Path) -> RunRequest {
    RunRequest {
        data_root: data_root.to_path_buf(),
        work_root: work_root.to_path_buf(),
        config_path: config_path.to_path_buf(),
    }
}

/// Millisecond polling so tests never sleep for long.
pub fn fast_poll() -> PollOptions {
    PollOptions {
        interval: Duration::from_millis(10),
        job_id_wait: Duration::from_millis(5),
        job_id_attempts: 20,
    }
}
