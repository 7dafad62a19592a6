use std::sync::Mutex;

use slurmbench::experiment::stats::RunStats;
use slurmbench::report::ProgressReporter;
use slurmbench::samples::RowNumberedSample;
use slurmbench::slurm::TaskOutcome;

/// Events seen by [`RecordingReporter`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Submitted { array_job_id: String, tasks: usize },
    TaskFinished { sample: String, job_id: String, outcome: TaskOutcome },
    Progress { finished: usize, total: usize },
    RunFinished(RunStats),
}

/// Reporter that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `(sample, outcome)` pairs in the order tasks finished.
    pub fn finished_tasks(&self) -> Vec<(String, TaskOutcome)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::TaskFinished { sample, outcome, .. } => Some((sample, outcome)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressReporter for RecordingReporter {
    fn submitted(&self, array_job_id: &str, task_count: usize) {
        self.push(ReportEvent::Submitted {
            array_job_id: array_job_id.to_string(),
            tasks: task_count,
        });
    }

    fn task_finished(&self, task: &RowNumberedSample, job_id: &str, outcome: &TaskOutcome) {
        self.push(ReportEvent::TaskFinished {
            sample: task.sample().exp_sample_id(),
            job_id: job_id.to_string(),
            outcome: *outcome,
        });
    }

    fn progress(&self, finished: usize, total: usize) {
        self.push(ReportEvent::Progress { finished, total });
    }

    fn run_finished(&self, stats: &RunStats) {
        self.push(ReportEvent::RunFinished(stats.clone()));
    }
}
