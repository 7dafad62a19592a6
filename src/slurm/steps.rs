// src/slurm/steps.rs

//! Script phases and the touch files that record their outcome.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::fs::FileSystem;

/// Phases of one array task, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    InitEnv,
    Command,
    CloseEnv,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::InitEnv, Step::Command, Step::CloseEnv];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::InitEnv => "init_env",
            Step::Command => "command",
            Step::CloseEnv => "close_env",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepOutcome {
    Ok,
    Error,
    /// The step never ran (an earlier step failed or the task was killed).
    Null,
}

impl StepOutcome {
    fn extension(&self) -> &'static str {
        match self {
            StepOutcome::Ok => "OK",
            StepOutcome::Error => "ERROR",
            StepOutcome::Null => "NULL",
        }
    }
}

/// `<job_id>_<step>.<OK|ERROR>`
pub fn step_sentinel_name(job_id: &str, step: Step, outcome: StepOutcome) -> String {
    format!("{job_id}_{step}.{}", outcome.extension())
}

pub const END_SENTINEL_STEM: &str = "end";

/// `<job_id>_end.OK`, touched after the last step succeeded.
pub fn end_sentinel_name(job_id: &str) -> String {
    format!("{job_id}_{END_SENTINEL_STEM}.OK")
}

/// Per-phase outcome of one array task, written as
/// `slurm/steps_status.yaml` in the sample directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatuses {
    pub init_env: StepOutcome,
    pub command: StepOutcome,
    pub close_env: StepOutcome,
}

impl StepStatuses {
    /// Read the step sentinels of `job_id` from the scheduler log dir.
    pub fn from_sentinels(fs: &dyn FileSystem, logs_dir: &Path, job_id: &str) -> Self {
        let outcome = |step: Step| {
            if fs.exists(&logs_dir.join(step_sentinel_name(job_id, step, StepOutcome::Error))) {
                StepOutcome::Error
            } else if fs.exists(&logs_dir.join(step_sentinel_name(job_id, step, StepOutcome::Ok))) {
                StepOutcome::Ok
            } else {
                StepOutcome::Null
            }
        };
        Self {
            init_env: outcome(Step::InitEnv),
            command: outcome(Step::Command),
            close_env: outcome(Step::CloseEnv),
        }
    }

    pub fn get(&self, step: Step) -> StepOutcome {
        match step {
            Step::InitEnv => self.init_env,
            Step::Command => self.command,
            Step::CloseEnv => self.close_env,
        }
    }
}
