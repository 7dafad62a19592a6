// src/experiment/layout.rs

//! Path computation for the data and work sides of an experiment.
//!
//! ```text
//! <root>/samples.tsv                               (data)
//! <root>/<topic>/<tool>/env_wrapper.sh             (data)
//! <root>/<topic>/<tool>/<exp>/config.yaml
//!                            /errors.tsv
//!                            /date.txt
//!                            /scripts/<date>_sbatch.sh
//!                            /scripts/<date>_<step>.sh
//!                            /logs/...                 (work)
//!                            /<species>_<sample>/...
//! ```
//!
//! Nothing here touches the disk except the explicit `create_*` methods.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::fs::ops;
use crate::samples::missing_inputs;
use crate::samples::status::{DONE_LOG, ERRORS_LOG, MISSING_INPUTS_TSV};
use crate::samples::{Sample, manifest};
use crate::slurm::SacctState;
use crate::slurm::steps::{Step, StepOutcome, end_sentinel_name, step_sentinel_name};
use crate::types::ToolDescription;

/// UTC, second resolution.
pub const DATE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub const ENV_WRAPPER_SH: &str = "env_wrapper.sh";
pub const CONFIG_YAML: &str = "config.yaml";
pub const ERRORS_TSV: &str = "errors.tsv";
pub const DATE_TXT: &str = "date.txt";
pub const SCRIPTS_DIR: &str = "scripts";
pub const LOGS_DIR: &str = "logs";
pub const ARRAY_JOB_ID_FILE: &str = "array_job.id";
pub const SAMPLE_SLURM_DIR: &str = "slurm";

pub fn date_stamp_now() -> String {
    Utc::now().format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Durable storage; samples are replaced whole, never partially edited.
    Data,
    /// Per-run scratch space, rebuilt at start and removed at the end.
    Work,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentLayout {
    kind: LayoutKind,
    root: PathBuf,
    tool: ToolDescription,
    experiment: String,
}

impl ExperimentLayout {
    pub fn new(
        kind: LayoutKind,
        root: impl Into<PathBuf>,
        tool: ToolDescription,
        experiment: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            root: root.into(),
            tool,
            experiment: experiment.into(),
        }
    }

    pub fn data(root: impl Into<PathBuf>, tool: ToolDescription, experiment: impl Into<String>) -> Self {
        Self::new(LayoutKind::Data, root, tool, experiment)
    }

    pub fn work(root: impl Into<PathBuf>, tool: ToolDescription, experiment: impl Into<String>) -> Self {
        Self::new(LayoutKind::Work, root, tool, experiment)
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tool(&self) -> &ToolDescription {
        &self.tool
    }

    pub fn experiment_name(&self) -> &str {
        &self.experiment
    }

    pub fn topic_dir(&self) -> PathBuf {
        self.root.join(self.tool.topic().name())
    }

    pub fn tool_dir(&self) -> PathBuf {
        self.topic_dir().join(self.tool.name())
    }

    pub fn exp_dir(&self) -> PathBuf {
        self.tool_dir().join(&self.experiment)
    }

    pub fn samples_tsv(&self) -> PathBuf {
        manifest::samples_tsv(&self.root)
    }

    /// Tool environment wrapper; only meaningful on the data side.
    pub fn env_wrapper_sh(&self) -> PathBuf {
        self.tool_dir().join(ENV_WRAPPER_SH)
    }

    pub fn config_yaml(&self) -> PathBuf {
        self.exp_dir().join(CONFIG_YAML)
    }

    pub fn errors_tsv(&self) -> PathBuf {
        self.exp_dir().join(ERRORS_TSV)
    }

    pub fn date_txt(&self) -> PathBuf {
        self.exp_dir().join(DATE_TXT)
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.exp_dir().join(SCRIPTS_DIR)
    }

    pub fn sbatch_script(&self, date_stamp: &str) -> PathBuf {
        self.scripts_dir().join(format!("{date_stamp}_sbatch.sh"))
    }

    pub fn step_script(&self, date_stamp: &str, step: Step) -> PathBuf {
        self.scripts_dir().join(format!("{date_stamp}_{step}.sh"))
    }

    // Scheduler logs (work side)

    pub fn logs_dir(&self) -> PathBuf {
        self.exp_dir().join(LOGS_DIR)
    }

    pub fn array_job_id_file(&self) -> PathBuf {
        self.logs_dir().join(ARRAY_JOB_ID_FILE)
    }

    pub fn stdout_log(&self, job_id: &str) -> PathBuf {
        self.logs_dir().join(format!("{job_id}_stdout.log"))
    }

    pub fn stderr_log(&self, job_id: &str) -> PathBuf {
        self.logs_dir().join(format!("{job_id}_stderr.log"))
    }

    pub fn step_sentinel(&self, job_id: &str, step: Step, outcome: StepOutcome) -> PathBuf {
        self.logs_dir().join(step_sentinel_name(job_id, step, outcome))
    }

    pub fn end_sentinel(&self, job_id: &str) -> PathBuf {
        self.logs_dir().join(end_sentinel_name(job_id))
    }

    // Per sample

    pub fn sample_dir(&self, sample: &Sample) -> PathBuf {
        self.exp_dir().join(sample.exp_sample_id())
    }

    pub fn done_log(&self, sample: &Sample) -> PathBuf {
        self.sample_dir(sample).join(DONE_LOG)
    }

    pub fn errors_log(&self, sample: &Sample) -> PathBuf {
        self.sample_dir(sample).join(ERRORS_LOG)
    }

    pub fn missing_inputs_tsv(&self, sample: &Sample) -> PathBuf {
        self.sample_dir(sample).join(MISSING_INPUTS_TSV)
    }

    pub fn sample_slurm_dir(&self, sample: &Sample) -> PathBuf {
        self.sample_dir(sample).join(SAMPLE_SLURM_DIR)
    }

    pub fn sample_stdout_log(&self, sample: &Sample) -> PathBuf {
        self.sample_slurm_dir(sample).join("stdout.log")
    }

    pub fn sample_stderr_log(&self, sample: &Sample) -> PathBuf {
        self.sample_slurm_dir(sample).join("stderr.log")
    }

    pub fn sample_stats_psv(&self, sample: &Sample) -> PathBuf {
        self.sample_slurm_dir(sample).join("stats.psv")
    }

    pub fn sample_job_state(&self, sample: &Sample, state: SacctState) -> PathBuf {
        self.sample_slurm_dir(sample).join(format!("job_state.{state}"))
    }

    pub fn sample_steps_status(&self, sample: &Sample) -> PathBuf {
        self.sample_slurm_dir(sample).join("steps_status.yaml")
    }

    /// Create the experiment and scripts directories (plus logs on the
    /// work side). Idempotent.
    pub fn create_dirs(&self) -> anyhow::Result<()> {
        ops::ensure_dir(&self.exp_dir())?;
        ops::ensure_dir(&self.scripts_dir())?;
        if self.kind == LayoutKind::Work {
            ops::ensure_dir(&self.logs_dir())?;
        }
        Ok(())
    }

    pub fn write_missing_inputs(
        &self,
        sample: &Sample,
        rows: &[missing_inputs::MissingInput],
    ) -> crate::errors::Result<()> {
        missing_inputs::write_missing_inputs(&self.missing_inputs_tsv(sample), rows)
    }
}

/// The data and work layouts of one run, sharing a date stamp.
#[derive(Debug, Clone)]
pub struct RunLayouts {
    pub data: ExperimentLayout,
    pub work: ExperimentLayout,
    pub date_stamp: String,
}

impl RunLayouts {
    pub fn new(
        data_root: impl Into<PathBuf>,
        work_root: impl Into<PathBuf>,
        tool: ToolDescription,
        experiment: &str,
    ) -> Self {
        Self::with_date_stamp(data_root, work_root, tool, experiment, date_stamp_now())
    }

    pub fn with_date_stamp(
        data_root: impl Into<PathBuf>,
        work_root: impl Into<PathBuf>,
        tool: ToolDescription,
        experiment: &str,
        date_stamp: impl Into<String>,
    ) -> Self {
        Self {
            data: ExperimentLayout::data(data_root, tool.clone(), experiment),
            work: ExperimentLayout::work(work_root, tool, experiment),
            date_stamp: date_stamp.into(),
        }
    }
}
