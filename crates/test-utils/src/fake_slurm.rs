use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use slurmbench::errors::{BenchError, Result};
use slurmbench::fs::ops;
use slurmbench::slurm::steps::{Step, StepOutcome, end_sentinel_name, step_sentinel_name};
use slurmbench::slurm::{SacctState, SchedulerBackend, Submission, array_task_job_id};

/// What the fake cluster does with one array task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeTask {
    Success,
    InitEnvError,
    CommandError,
    CloseEnvError,
    /// Dies without touching any sentinel; `sacct` reports the state.
    SchedulerKill(SacctState),
    /// Stays pending forever.
    Never,
}

/// A scheduler backend that "runs" a submitted array instantly.
///
/// On `submit` it reads the sbatch script, then writes the logs, step
/// sentinels and array job id file each task would have produced.
pub struct FakeSlurm {
    array_job_id: String,
    print_job_id: bool,
    tasks: Mutex<BTreeMap<usize, FakeTask>>,
    states: Mutex<BTreeMap<String, SacctState>>,
    submissions: Mutex<Vec<SubmittedArray>>,
}

/// One recorded `sbatch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedArray {
    pub script: PathBuf,
    pub indices: Vec<usize>,
    pub directives: Vec<String>,
}

impl FakeSlurm {
    pub fn new(array_job_id: &str) -> Self {
        Self {
            array_job_id: array_job_id.to_string(),
            print_job_id: true,
            tasks: Mutex::new(BTreeMap::new()),
            states: Mutex::new(BTreeMap::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Make `sbatch` print nothing useful so the id file must be used.
    pub fn silent_sbatch(mut self) -> Self {
        self.print_job_id = false;
        self
    }

    /// Behaviour of the task at `index`; unset tasks succeed.
    pub fn with_task(self, index: usize, task: FakeTask) -> Self {
        self.tasks.lock().unwrap().insert(index, task);
        self
    }

    pub fn submissions(&self) -> Vec<SubmittedArray> {
        self.submissions.lock().unwrap().clone()
    }

    fn task(&self, index: usize) -> FakeTask {
        self.tasks
            .lock()
            .unwrap()
            .get(&index)
            .copied()
            .unwrap_or(FakeTask::Success)
    }

    fn run_array(&self, script: &Path) -> anyhow::Result<SubmittedArray> {
        let text = std::fs::read_to_string(script)?;
        let parsed = ParsedScript::parse(&text);
        let logs_dir = parsed
            .logs_dir
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no LOGS_DIR in {script:?}"))?;

        let mut any_started = false;
        for &index in &parsed.indices {
            let job_id = array_task_job_id(&self.array_job_id, index);
            let task = self.task(index);
            let expand = |pattern: &str| {
                PathBuf::from(
                    pattern
                        .replace("%A", &self.array_job_id)
                        .replace("%a", &index.to_string()),
                )
            };
            let stdout = parsed.output.as_deref().map(expand);
            let stderr = parsed.error.as_deref().map(expand);
            if task != FakeTask::Never {
                any_started = true;
                if let Some(path) = &stdout {
                    ops::write_file(path, format!("task {job_id} stdout\n"))?;
                }
                if let Some(path) = &stderr {
                    ops::write_file(path, format!("task {job_id} stderr\n"))?;
                }
            }

            let touch = |step: Step, outcome: StepOutcome| {
                ops::touch(&logs_dir.join(step_sentinel_name(&job_id, step, outcome)))
            };
            let state = match task {
                FakeTask::Success => {
                    for step in Step::ALL {
                        touch(step, StepOutcome::Ok)?;
                    }
                    ops::touch(&logs_dir.join(end_sentinel_name(&job_id)))?;
                    SacctState::Completed
                }
                FakeTask::InitEnvError => {
                    touch(Step::InitEnv, StepOutcome::Error)?;
                    SacctState::Failed
                }
                FakeTask::CommandError => {
                    touch(Step::InitEnv, StepOutcome::Ok)?;
                    touch(Step::Command, StepOutcome::Error)?;
                    SacctState::Failed
                }
                FakeTask::CloseEnvError => {
                    touch(Step::InitEnv, StepOutcome::Ok)?;
                    touch(Step::Command, StepOutcome::Ok)?;
                    touch(Step::CloseEnv, StepOutcome::Error)?;
                    SacctState::Failed
                }
                FakeTask::SchedulerKill(state) => state,
                FakeTask::Never => SacctState::Pending,
            };
            self.states.lock().unwrap().insert(job_id, state);
        }

        if any_started {
            if let Some(id_file) = &parsed.array_job_id_file {
                ops::write_file(id_file, format!("{}\n", self.array_job_id))?;
            }
        }

        Ok(SubmittedArray {
            script: script.to_path_buf(),
            indices: parsed.indices,
            directives: parsed.directives,
        })
    }
}

impl SchedulerBackend for FakeSlurm {
    fn submit(&self, script: PathBuf) -> Pin<Box<dyn Future<Output = Result<Submission>> + Send + '_>> {
        Box::pin(async move {
            let submitted = self
                .run_array(&script)
                .map_err(|e| BenchError::Scheduler(format!("fake sbatch: {e:#}")))?;
            self.submissions.lock().unwrap().push(submitted);
            Ok(Submission {
                array_job_id: self.print_job_id.then(|| self.array_job_id.clone()),
            })
        })
    }

    fn task_states(
        &self,
        job_ids: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<BTreeMap<String, SacctState>>> + Send + '_>> {
        Box::pin(async move {
            let states = self.states.lock().unwrap();
            Ok(job_ids
                .into_iter()
                .filter_map(|id| states.get(&id).map(|s| (id, *s)))
                .collect())
        })
    }

    fn accounting(&self, job_id: String) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async move {
            let state = self
                .states
                .lock()
                .unwrap()
                .get(&job_id)
                .copied()
                .ok_or_else(|| BenchError::Scheduler(format!("unknown job {job_id}")))?;
            Ok(format!("JobID|JobName|State\n{job_id}|fake|{state}\n"))
        })
    }
}

#[derive(Debug, Default)]
struct ParsedScript {
    indices: Vec<usize>,
    output: Option<String>,
    error: Option<String>,
    directives: Vec<String>,
    logs_dir: Option<PathBuf>,
    array_job_id_file: Option<PathBuf>,
}

impl ParsedScript {
    fn parse(text: &str) -> Self {
        let mut parsed = ParsedScript::default();
        for line in text.lines() {
            if let Some(directive) = line.strip_prefix("#SBATCH ") {
                parsed.directives.push(directive.to_string());
                if let Some(array) = directive.strip_prefix("--array=") {
                    parsed.indices = array.split(',').filter_map(|i| i.parse().ok()).collect();
                } else if let Some(out) = directive.strip_prefix("--output=") {
                    parsed.output = Some(out.to_string());
                } else if let Some(err) = directive.strip_prefix("--error=") {
                    parsed.error = Some(err.to_string());
                }
            } else if let Some(value) = line.strip_prefix("LOGS_DIR=") {
                parsed.logs_dir = Some(PathBuf::from(unquote(value)));
            } else if let Some(value) = line.strip_prefix("ARRAY_JOB_ID_FILE=") {
                parsed.array_job_id_file = Some(PathBuf::from(unquote(value)));
            }
        }
        parsed
    }
}

fn unquote(value: &str) -> String {
    value
        .trim()
        .trim_start_matches('\'')
        .trim_end_matches('\'')
        .replace(r"'\''", "'")
}
