// src/slurm/backend.rs

//! Pluggable scheduler backend.
//!
//! The run engine only talks to SLURM through [`SchedulerBackend`]:
//!
//! - `submit`: submission script in, array job id out (when sbatch prints it)
//! - `task_states`: array task job ids in, `sacct` states out
//! - `accounting`: one job id in, the raw `sacct --long` record out
//!
//! [`SlurmBackend`] shells out to `sbatch`/`sacct`; tests swap in a fake
//! that materializes the log and sentinel files itself.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{BenchError, Result};
use crate::slurm::{SacctState, array_task_job_id};

/// What `sbatch` told us about a submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Submission {
    /// `None` when the id could not be read from the submission output; the
    /// caller then falls back to the id file written by the first task.
    pub array_job_id: Option<String>,
}

/// Trait abstracting how jobs reach the batch scheduler.
pub trait SchedulerBackend: Send + Sync {
    fn submit(&self, script: PathBuf) -> Pin<Box<dyn Future<Output = Result<Submission>> + Send + '_>>;

    /// States of the given array task job ids (`<array>_<index>`). Ids the
    /// scheduler does not know yet are simply absent from the map.
    fn task_states(
        &self,
        job_ids: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<BTreeMap<String, SacctState>>> + Send + '_>>;

    /// Pipe-separated accounting record for one array task.
    fn accounting(&self, job_id: String) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}

/// Real backend calling the SLURM command-line tools.
#[derive(Debug, Clone)]
pub struct SlurmBackend {
    sbatch: String,
    sacct: String,
}

impl SlurmBackend {
    pub fn new(sbatch: impl Into<String>, sacct: impl Into<String>) -> Self {
        Self {
            sbatch: sbatch.into(),
            sacct: sacct.into(),
        }
    }

    async fn run(program: &str, args: &[String]) -> Result<String> {
        debug!(program, ?args, "running scheduler command");
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| BenchError::Scheduler(format!("could not run {program}: {e}")))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BenchError::Scheduler(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(stdout)
    }
}

impl Default for SlurmBackend {
    fn default() -> Self {
        Self::new("sbatch", "sacct")
    }
}

impl SchedulerBackend for SlurmBackend {
    fn submit(&self, script: PathBuf) -> Pin<Box<dyn Future<Output = Result<Submission>> + Send + '_>> {
        Box::pin(async move {
            let stdout = Self::run(&self.sbatch, &[path_arg(&script)]).await?;
            let array_job_id = parse_sbatch_output(&stdout);
            if array_job_id.is_none() {
                warn!(stdout = %stdout.trim(), "could not read job id from sbatch output");
            }
            Ok(Submission { array_job_id })
        })
    }

    fn task_states(
        &self,
        job_ids: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<BTreeMap<String, SacctState>>> + Send + '_>> {
        Box::pin(async move {
            if job_ids.is_empty() {
                return Ok(BTreeMap::new());
            }
            let args = [
                "--jobs".to_string(),
                job_ids.join(","),
                "--format=JobID,State".to_string(),
                "-P".to_string(),
                "-X".to_string(),
            ];
            let stdout = Self::run(&self.sacct, &args).await?;
            Ok(parse_sacct_states(&stdout))
        })
    }

    fn accounting(&self, job_id: String) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async move {
            let args = [
                "--long".to_string(),
                "--jobs".to_string(),
                job_id,
                "--parsable2".to_string(),
            ];
            Self::run(&self.sacct, &args).await
        })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

static SUBMITTED_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Submitted batch job (\d+)").ok());

/// Extract the job id from `sbatch` stdout (`Submitted batch job 1234`).
pub fn parse_sbatch_output(stdout: &str) -> Option<String> {
    let re = SUBMITTED_RE.as_ref()?;
    re.captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse `sacct --format=JobID,State -P -X` output (header line first).
///
/// Array elements that have not started yet are reported as one record
/// such as `42_[2-4,7%2]`; such records are expanded to `42_2`, `42_3`,
/// `42_4` and `42_7`.
pub fn parse_sacct_states(stdout: &str) -> BTreeMap<String, SacctState> {
    let mut states = BTreeMap::new();
    for line in stdout.lines().skip(1) {
        let mut columns = line.split('|');
        let (Some(job_id), Some(state)) = (columns.next(), columns.next()) else {
            continue;
        };
        match state.parse::<SacctState>() {
            Ok(state) => {
                for id in expand_array_record(job_id.trim()) {
                    states.insert(id, state);
                }
            }
            Err(e) => warn!(job_id, error = %e, "ignoring sacct line"),
        }
    }
    states
}

fn expand_array_record(job_id: &str) -> Vec<String> {
    let Some((array_id, ranges)) = job_id
        .strip_suffix(']')
        .and_then(|rest| rest.split_once("_["))
    else {
        return vec![job_id.to_string()];
    };
    // `%N` is the array throttle, not part of the index list.
    let ranges = ranges.split_once('%').map_or(ranges, |(r, _)| r);
    let mut ids = Vec::new();
    for part in ranges.split(',') {
        let bounds = match part.split_once('-') {
            Some((lo, hi)) => lo.parse::<usize>().ok().zip(hi.parse::<usize>().ok()),
            None => part.parse::<usize>().ok().map(|i| (i, i)),
        };
        match bounds {
            Some((lo, hi)) => ids.extend((lo..=hi).map(|i| array_task_job_id(array_id, i))),
            None => warn!(job_id, range = part, "ignoring malformed array range"),
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sbatch_output_yields_job_id() {
        assert_eq!(
            parse_sbatch_output("Submitted batch job 4242\n"),
            Some("4242".to_string())
        );
        assert_eq!(parse_sbatch_output("sbatch: error: invalid partition"), None);
    }

    #[test]
    fn sacct_states_skip_header_and_unknown_states() {
        let stdout = "JobID|State\n4242_2|COMPLETED\n4242_3|CANCELLED by 0\n4242_4|WEIRD\n";
        let states = parse_sacct_states(stdout);
        assert_eq!(states.len(), 2);
        assert_eq!(states["4242_2"], SacctState::Completed);
        assert_eq!(states["4242_3"], SacctState::Cancelled);
    }

    #[test]
    fn pending_array_records_expand_to_every_task() {
        let stdout = "JobID|State\n9_1|RUNNING\n9_[2-4,7%2]|PENDING\n9_[8]|CANCELLED by 0\n";
        let states = parse_sacct_states(stdout);
        let ids: Vec<&str> = states.keys().map(String::as_str).collect();
        assert_eq!(ids, ["9_1", "9_2", "9_3", "9_4", "9_7", "9_8"]);
        assert_eq!(states["9_1"], SacctState::Running);
        assert_eq!(states["9_3"], SacctState::Pending);
        assert_eq!(states["9_7"], SacctState::Pending);
        assert_eq!(states["9_8"], SacctState::Cancelled);
    }
}
