// src/experiment/migrate.rs

//! Result migration from the work side to the data side.
//!
//! Two phases:
//!
//! 1. [`finalize_task_logs`]: per submitted sample, turn the scheduler logs
//!    into `done.log`/`errors.log` plus the `slurm/` records.
//! 2. [`migrate_to_data`]: replace each data sample dir with its work copy,
//!    then carry over scripts, ledger and date, and clean up the work tree.
//!
//! Migration is at-least-once: a crash after the copy and before the work
//! removal leaves both copies, and the data side wins on the next read.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::errors::{BenchError, Result};
use crate::experiment::layout::{ExperimentLayout, RunLayouts};
use crate::fs::{FileSystem, ops};
use crate::samples::RowNumberedSample;
use crate::slurm::{SacctState, SchedulerBackend, StepStatuses, TaskOutcome, array_task_job_id};

/// Write the per-sample logs and scheduler records of every finished task.
pub async fn finalize_task_logs(
    fs: &dyn FileSystem,
    backend: &dyn SchedulerBackend,
    work: &ExperimentLayout,
    array_job_id: &str,
    tasks: &[RowNumberedSample],
    outcomes: &BTreeMap<usize, TaskOutcome>,
) -> Result<()> {
    let job_ids: Vec<String> = tasks
        .iter()
        .map(|t| array_task_job_id(array_job_id, t.array_task_index()))
        .collect();
    let states = backend.task_states(job_ids).await.unwrap_or_else(|err| {
        warn!(error = %err, "could not query final task states");
        BTreeMap::new()
    });

    for task in tasks {
        let Some(outcome) = outcomes.get(&task.array_task_index()) else {
            continue;
        };
        let job_id = array_task_job_id(array_job_id, task.array_task_index());
        let state = states
            .get(&job_id)
            .copied()
            .unwrap_or_else(|| fallback_state(outcome));
        finalize_task(fs, work, task, &job_id, outcome, state)?;

        match backend.accounting(job_id.clone()).await {
            Ok(record) => ops::write_file(&work.sample_stats_psv(task.sample()), record)?,
            Err(err) => warn!(job_id = %job_id, error = %err, "no accounting record"),
        }
    }
    Ok(())
}

fn fallback_state(outcome: &TaskOutcome) -> SacctState {
    match outcome {
        TaskOutcome::SchedulerFailed(state) => *state,
        TaskOutcome::End | TaskOutcome::CloseEnvError => SacctState::Completed,
        TaskOutcome::InitEnvError | TaskOutcome::CommandError => SacctState::Failed,
    }
}

fn finalize_task(
    fs: &dyn FileSystem,
    work: &ExperimentLayout,
    task: &RowNumberedSample,
    job_id: &str,
    outcome: &TaskOutcome,
    state: SacctState,
) -> Result<()> {
    let sample = task.sample();
    ops::ensure_dir(&work.sample_slurm_dir(sample))?;

    let stdout = work.stdout_log(job_id);
    let stderr = work.stderr_log(job_id);
    copy_log(&stdout, &work.sample_stdout_log(sample))?;
    copy_log(&stderr, &work.sample_stderr_log(sample))?;

    if outcome.is_sample_success() {
        if stdout.is_file() {
            ops::copy_file(&stdout, &work.done_log(sample))?;
        } else {
            ops::write_file(&work.done_log(sample), format!("job {job_id} ended without stdout log\n"))?;
        }
    } else if stderr.is_file() {
        ops::copy_file(&stderr, &work.errors_log(sample))?;
    } else {
        ops::write_file(
            &work.errors_log(sample),
            format!("job {job_id} failed ({outcome:?}) without stderr log\n"),
        )?;
    }

    let steps = StepStatuses::from_sentinels(fs, &work.logs_dir(), job_id);
    ops::write_file(&work.sample_steps_status(sample), serde_yaml::to_string(&steps)?)?;
    ops::touch(&work.sample_job_state(sample, state))?;
    debug!(%sample, job_id, ?outcome, %state, "finalized task logs");
    Ok(())
}

fn copy_log(src: &Path, dst: &Path) -> Result<()> {
    if src.is_file() {
        ops::copy_file(src, dst)?;
    } else {
        warn!(log = ?src, "scheduler log missing");
    }
    Ok(())
}

/// Move every sample of the run to the data side and clean up the work
/// experiment.
///
/// A sample whose copy fails keeps its work directory; the work experiment
/// is then left in place and the run fails with [`BenchError::Migration`].
pub fn migrate_to_data(layouts: &RunLayouts, samples: &[RowNumberedSample]) -> Result<()> {
    let RunLayouts { data, work, .. } = layouts;
    info!(samples = samples.len(), "moving results to data directory");

    let mut failed = Vec::new();
    for task in samples {
        let sample = task.sample();
        let src = work.sample_dir(sample);
        if !src.is_dir() {
            continue;
        }
        match ops::replace_dir_with_copy(&src, &data.sample_dir(sample)) {
            Ok(()) => ops::remove_dir_best_effort(&src),
            Err(err) => {
                let reason = format!("{err:#}");
                error!(%sample, error = %reason, "could not migrate sample");
                failed.push(sample.exp_sample_id());
            }
        }
    }

    copy_scripts(work, data)?;
    if work.errors_tsv().is_file() {
        ops::copy_file(&work.errors_tsv(), &data.errors_tsv())?;
    }
    if work.date_txt().is_file() {
        ops::copy_file(&work.date_txt(), &data.date_txt())?;
    }

    if !failed.is_empty() {
        return Err(BenchError::Migration(failed));
    }

    ops::remove_dir_best_effort(&work.exp_dir());
    ops::prune_empty_upward(&work.tool_dir(), work.root());
    Ok(())
}

fn copy_scripts(work: &ExperimentLayout, data: &ExperimentLayout) -> Result<()> {
    let scripts = work.scripts_dir();
    if !scripts.is_dir() {
        return Ok(());
    }
    for entry in walkdir::WalkDir::new(&scripts).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| BenchError::Other(e.into()))?;
        if entry.file_type().is_file() {
            ops::copy_file(entry.path(), &data.scripts_dir().join(entry.file_name()))?;
        }
    }
    Ok(())
}
