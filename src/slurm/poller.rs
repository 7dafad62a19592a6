// src/slurm/poller.rs

//! Completion polling.
//!
//! Array tasks run on the cluster, outside this process. Their progress is
//! only visible through the sentinel files the submission script touches:
//!
//! ```text
//! PENDING -> INIT_ENV_ERROR | COMMAND_ERROR | CLOSE_ENV_ERROR | END
//! ```
//!
//! A task that dies before touching any sentinel (timeout, OOM kill, node
//! failure) is caught through `sacct` and becomes `SchedulerFailed`.
//!
//! Polling has no overall timeout. Cancellation only stops this
//! observation; the jobs keep running on the cluster.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

use crate::errors::{BenchError, Result};
use crate::experiment::layout::ExperimentLayout;
use crate::fs::FileSystem;
use crate::report::ProgressReporter;
use crate::samples::{RowNumberedSample, SampleStatus};
use crate::slurm::steps::{Step, StepOutcome};
use crate::slurm::{SacctState, SchedulerBackend, Submission, array_task_job_id};

/// Terminal state of one array task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    InitEnvError,
    CommandError,
    /// The tool finished; only the environment teardown failed.
    CloseEnvError,
    End,
    /// Killed by the scheduler before reaching a sentinel.
    SchedulerFailed(SacctState),
}

impl TaskOutcome {
    /// Whether the sample's own result is usable.
    pub fn is_sample_success(&self) -> bool {
        matches!(self, TaskOutcome::CloseEnvError | TaskOutcome::End)
    }

    pub fn sample_status(&self) -> SampleStatus {
        if self.is_sample_success() {
            SampleStatus::Ok
        } else {
            SampleStatus::Error
        }
    }
}

/// Sentinels checked in script order; the end marker comes last.
const ERROR_SENTINELS: [(Step, TaskOutcome); 3] = [
    (Step::InitEnv, TaskOutcome::InitEnvError),
    (Step::Command, TaskOutcome::CommandError),
    (Step::CloseEnv, TaskOutcome::CloseEnvError),
];

/// Terminal outcome of `job_id` read from its sentinels, `None` while the
/// task is still pending or running.
pub fn task_outcome(fs: &dyn FileSystem, work: &ExperimentLayout, job_id: &str) -> Option<TaskOutcome> {
    ERROR_SENTINELS
        .iter()
        .find(|(step, _)| fs.exists(&work.step_sentinel(job_id, *step, StepOutcome::Error)))
        .map(|(_, outcome)| *outcome)
        .or_else(|| fs.exists(&work.end_sentinel(job_id)).then_some(TaskOutcome::End))
}

#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between two sentinel sweeps.
    pub interval: Duration,
    /// Delay between two reads of the array job id file.
    pub job_id_wait: Duration,
    pub job_id_attempts: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            job_id_wait: Duration::from_secs(10),
            job_id_attempts: 30,
        }
    }
}

pub struct CompletionPoller<'a> {
    pub fs: &'a dyn FileSystem,
    pub backend: &'a dyn SchedulerBackend,
    pub reporter: &'a dyn ProgressReporter,
    pub options: &'a PollOptions,
}

impl CompletionPoller<'_> {
    /// Array job id from the submission, or from the id file written by the
    /// first task to start.
    pub async fn array_job_id(
        &self,
        submission: &Submission,
        work: &ExperimentLayout,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<String> {
        if let Some(id) = &submission.array_job_id {
            return Ok(id.clone());
        }
        let id_file = work.array_job_id_file();
        for attempt in 1..=self.options.job_id_attempts {
            if let Some(id) = read_job_id(self.fs, &id_file) {
                debug!(attempt, job_id = %id, "read array job id file");
                return Ok(id);
            }
            tokio::select! {
                _ = sleep(self.options.job_id_wait) => {}
                _ = cancelled(cancel) => return Err(BenchError::PollCancelled),
            }
        }
        Err(BenchError::Scheduler(format!(
            "array job id file {:?} not written after {} attempts",
            id_file, self.options.job_id_attempts
        )))
    }

    /// Block until every task is terminal and return the outcomes keyed by
    /// array task index.
    pub async fn wait(
        &self,
        work: &ExperimentLayout,
        array_job_id: &str,
        tasks: &[RowNumberedSample],
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<BTreeMap<usize, TaskOutcome>> {
        let mut pending: BTreeMap<String, &RowNumberedSample> = tasks
            .iter()
            .map(|t| (array_task_job_id(array_job_id, t.array_task_index()), t))
            .collect();
        let total = pending.len();
        let mut outcomes = BTreeMap::new();

        let mut ticker = interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(array_job_id, total, "waiting for array tasks");
        while !pending.is_empty() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancelled(cancel) => {
                    warn!(array_job_id, pending = pending.len(), "stopped polling; jobs keep running");
                    return Err(BenchError::PollCancelled);
                }
            }

            let finished = self.sweep(work, &pending).await;
            for (job_id, outcome) in finished {
                if let Some(task) = pending.remove(&job_id) {
                    self.reporter.task_finished(task, &job_id, &outcome);
                    outcomes.insert(task.array_task_index(), outcome);
                }
            }
            self.reporter.progress(total - pending.len(), total);
        }
        Ok(outcomes)
    }

    /// Newly terminal tasks among `pending`.
    async fn sweep(
        &self,
        work: &ExperimentLayout,
        pending: &BTreeMap<String, &RowNumberedSample>,
    ) -> Vec<(String, TaskOutcome)> {
        let mut finished: Vec<(String, TaskOutcome)> = pending
            .keys()
            .filter_map(|job_id| task_outcome(self.fs, work, job_id).map(|o| (job_id.clone(), o)))
            .collect();
        if finished.len() == pending.len() {
            return finished;
        }

        let silent: Vec<String> = pending
            .keys()
            .filter(|job_id| !finished.iter().any(|(done, _)| done == *job_id))
            .cloned()
            .collect();
        let states = match self.backend.task_states(silent.clone()).await {
            Ok(states) => states,
            Err(err) => {
                warn!(error = %err, "could not query task states; relying on sentinels");
                return finished;
            }
        };
        for job_id in silent {
            let Some(state) = states.get(&job_id).filter(|s| s.is_failure()) else {
                continue;
            };
            // The task may have touched a sentinel right before exiting.
            let outcome = task_outcome(self.fs, work, &job_id)
                .unwrap_or(TaskOutcome::SchedulerFailed(*state));
            finished.push((job_id, outcome));
        }
        finished
    }
}

fn read_job_id(fs: &dyn FileSystem, path: &Path) -> Option<String> {
    fs.read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolves once cancellation is requested; never resolves if the sender
/// is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
