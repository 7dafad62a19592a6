// src/report.rs

//! Progress reporting, injected into the run instead of a global console.

use tracing::{info, warn};

use crate::experiment::stats::RunStats;
use crate::samples::RowNumberedSample;
use crate::slurm::TaskOutcome;

pub trait ProgressReporter: Send + Sync {
    fn submitted(&self, array_job_id: &str, task_count: usize);
    fn task_finished(&self, task: &RowNumberedSample, job_id: &str, outcome: &TaskOutcome);
    fn progress(&self, finished: usize, total: usize);
    fn run_finished(&self, stats: &RunStats);
}

/// Default reporter: everything goes to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn submitted(&self, array_job_id: &str, task_count: usize) {
        info!(array_job_id, task_count, "array job submitted");
    }

    fn task_finished(&self, task: &RowNumberedSample, job_id: &str, outcome: &TaskOutcome) {
        let sample = task.sample().exp_sample_id();
        match outcome {
            TaskOutcome::End => info!(%sample, job_id, "sample done"),
            TaskOutcome::CloseEnvError => {
                warn!(%sample, job_id, "sample done but closing the tool environment failed")
            }
            other => warn!(%sample, job_id, outcome = ?other, "sample failed"),
        }
    }

    fn progress(&self, finished: usize, total: usize) {
        info!(finished, total, "array tasks finished");
    }

    fn run_finished(&self, stats: &RunStats) {
        info!(
            total = stats.number_of_samples,
            already_done = stats.number_of_already_done(),
            missing_inputs = stats.samples_with_missing_inputs.len(),
            run = stats.number_of_submitted(),
            successful = stats.number_of_successful(),
            errors = stats.samples_with_errors.len(),
            "experiment run summary"
        );
    }
}
