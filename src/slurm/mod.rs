// src/slurm/mod.rs

//! Batch scheduler boundary.
//!
//! - [`backend`]: the `SchedulerBackend` trait and the real `sbatch`/`sacct`
//!   implementation.
//! - [`state`]: `sacct` job states.
//! - [`steps`]: script phases and their sentinel files.
//! - [`poller`]: waits for every array task to reach a terminal sentinel.

pub mod backend;
pub mod poller;
pub mod state;
pub mod steps;

pub use backend::{SchedulerBackend, SlurmBackend, Submission};
pub use poller::{CompletionPoller, PollOptions, TaskOutcome};
pub use state::SacctState;
pub use steps::{Step, StepOutcome, StepStatuses};

/// Job id of one array task: `<array_job_id>_<task_index>`.
pub fn array_task_job_id(array_job_id: &str, task_index: usize) -> String {
    format!("{array_job_id}_{task_index}")
}
