// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Settings file as read from TOML, before validation.
///
/// ```toml
/// [scheduler]
/// poll_interval = "60s"
///
/// [topic.assembly]
/// cmd = "asm"
///
/// [tool.unicycler]
/// topic = "assembly"
/// provides = ["fasta_gz", "gfa_gz"]
/// command = "unicycler -o \"$WORK_EXP_SAMPLE_DIR\" \"${USER_TOOL_OPTIONS[@]}\""
///
/// [tool.plasbin.arguments.graph]
/// topic = "assembly"
/// result = "gfa_gz"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSettings {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Keyed by topic name.
    #[serde(default)]
    pub topic: BTreeMap<String, TopicSection>,

    /// Keyed by tool name.
    #[serde(default)]
    pub tool: BTreeMap<String, ToolSection>,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerSection {
    #[serde(default = "default_sbatch")]
    pub sbatch: String,

    #[serde(default = "default_sacct")]
    pub sacct: String,

    /// Delay between two sentinel sweeps, e.g. `"60s"`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Delay between two reads of the array job id file.
    #[serde(default = "default_job_id_wait")]
    pub job_id_wait: String,

    #[serde(default = "default_job_id_attempts")]
    pub job_id_attempts: u32,
}

fn default_sbatch() -> String {
    "sbatch".to_string()
}

fn default_sacct() -> String {
    "sacct".to_string()
}

fn default_poll_interval() -> String {
    "60s".to_string()
}

fn default_job_id_wait() -> String {
    "10s".to_string()
}

fn default_job_id_attempts() -> u32 {
    30
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            sbatch: default_sbatch(),
            sacct: default_sacct(),
            poll_interval: default_poll_interval(),
            job_id_wait: default_job_id_wait(),
            job_id_attempts: default_job_id_attempts(),
        }
    }
}

/// `[topic.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicSection {
    /// Short command name; defaults to the topic name.
    #[serde(default)]
    pub cmd: Option<String>,
}

/// `[tool.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSection {
    pub topic: String,

    /// Command name used on the CLI; defaults to the tool name.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Result kinds found in the tool's native output.
    #[serde(default)]
    pub provides: Vec<String>,

    /// Shell lines that run the tool inside one array task.
    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub arguments: BTreeMap<String, ArgumentSection>,
}

/// `[tool.<name>.arguments.<arg>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgumentSection {
    /// Topic whose tools may feed this argument.
    pub topic: String,

    /// Result kind required from the upstream tool.
    pub result: String,

    /// Converted file name inside the upstream sample directory, when the
    /// argument consumes a formatted result.
    #[serde(default)]
    pub formatted: Option<String>,
}
