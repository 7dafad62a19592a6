// src/experiment/run.rs

//! Run orchestration.
//!
//! ```text
//! access -> config -> arguments -> env wrapper -> same experiment
//!        -> work layout -> samples to run -> missing inputs
//!        -> scripts -> submit -> poll -> task logs -> migrate
//! ```
//!
//! Everything up to "same experiment" is read-only: a failure there leaves
//! both trees untouched.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::connector::Connector;
use crate::errors::Result;
use crate::experiment::checks::{self, BlockedSample};
use crate::experiment::config::ExperimentConfig;
use crate::experiment::layout::RunLayouts;
use crate::experiment::ledger::{self, LedgerRow};
use crate::experiment::migrate;
use crate::experiment::stats::RunStats;
use crate::fs::{FileSystem, RealFileSystem, ops};
use crate::report::{ProgressReporter, TracingReporter};
use crate::samples::{RowNumberedSample, SampleStatus, read_manifest};
use crate::script::{self, EnvWrapper, ScriptInputs};
use crate::slurm::{CompletionPoller, PollOptions, SchedulerBackend};

/// Where to run and with which experiment config.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub data_root: PathBuf,
    pub work_root: PathBuf,
    pub config_path: PathBuf,
}

pub struct ExperimentRunner {
    fs: Arc<dyn FileSystem>,
    backend: Arc<dyn SchedulerBackend>,
    reporter: Arc<dyn ProgressReporter>,
    poll: PollOptions,
    cancel: watch::Receiver<bool>,
    // Keeps the default channel open; a closed channel never cancels.
    _cancel_tx: Option<watch::Sender<bool>>,
}

impl ExperimentRunner {
    pub fn new(backend: Arc<dyn SchedulerBackend>) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            fs: Arc::new(RealFileSystem),
            backend,
            reporter: Arc::new(TracingReporter),
            poll: PollOptions::default(),
            cancel: rx,
            _cancel_tx: Some(tx),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    /// Stop polling once `true` is sent. Submitted jobs are not cancelled.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self._cancel_tx = None;
        self
    }

    #[instrument(skip_all, fields(tool = %connector.description().name()))]
    pub async fn run(&self, connector: &Connector, request: &RunRequest) -> Result<RunStats> {
        let fs = self.fs.as_ref();

        checks::check_access(&request.data_root, false)?;
        checks::check_access(&request.work_root, true)?;

        let config = ExperimentConfig::read(fs, &request.config_path)?;
        debug!(config = ?config, "experiment config");
        let inputs = connector.resolve_inputs(&config, &request.data_root)?;

        let layouts = RunLayouts::new(
            &request.data_root,
            &request.work_root,
            connector.description().clone(),
            &config.name,
        );
        let wrapper = EnvWrapper::read(fs, &layouts.data.env_wrapper_sh())?;
        let existed = checks::ensure_same_experiment(fs, &layouts.data, &config)?;
        let manifest = read_manifest(fs, &layouts.data.samples_tsv())?;

        self.prepare_layouts(&layouts, &config, existed)?;

        let to_run = checks::samples_to_run(fs, &layouts.data, &manifest);
        let mut stats = RunStats {
            number_of_samples: manifest.samples.len(),
            number_of_samples_to_run: to_run.len(),
            ..RunStats::default()
        };
        info!(
            experiment = %config.name,
            total = stats.number_of_samples,
            to_run = stats.number_of_samples_to_run,
            "selected samples"
        );

        let (runnable, blocked) = checks::partition_by_inputs(fs, to_run.clone(), &inputs);
        self.record_blocked(&layouts, &blocked, &mut stats)?;

        if !runnable.is_empty() {
            let tool_lines = connector.script_lines(&config, &inputs, &layouts.data, &layouts.work);
            let sbatch = script::write_run_scripts(&ScriptInputs {
                layouts: &layouts,
                wrapper: &wrapper,
                config: &config,
                columns: manifest.columns,
                tool_lines: &tool_lines,
                samples: &runnable,
            })?;
            stats.samples_with_errors = self.submit_and_wait(&layouts, sbatch, &runnable).await?;
            ledger::append_ledger(
                &layouts.work.errors_tsv(),
                &stats
                    .samples_with_errors
                    .iter()
                    .map(|id| LedgerRow::new(id.as_str(), SampleStatus::Error))
                    .collect::<Vec<_>>(),
            )?;
        } else {
            info!("no sample to submit");
        }

        migrate::migrate_to_data(&layouts, &to_run)?;
        self.reporter.run_finished(&stats);
        Ok(stats)
    }

    /// First mutation of the run: data config on first run, fresh work tree.
    fn prepare_layouts(&self, layouts: &RunLayouts, config: &ExperimentConfig, existed: bool) -> Result<()> {
        let RunLayouts {
            data,
            work,
            date_stamp,
        } = layouts;
        data.create_dirs()?;
        if !existed {
            config.write(&data.config_yaml())?;
        }
        ops::remove_dir_if_exists(&work.exp_dir())?;
        work.create_dirs()?;
        config.write(&work.config_yaml())?;
        ops::write_file(&work.date_txt(), format!("{date_stamp}\n"))?;
        Ok(())
    }

    fn record_blocked(&self, layouts: &RunLayouts, blocked: &[BlockedSample], stats: &mut RunStats) -> Result<()> {
        let mut rows = Vec::with_capacity(blocked.len());
        for entry in blocked {
            let sample = entry.sample.sample();
            layouts.work.write_missing_inputs(sample, &entry.missing)?;
            stats.samples_with_missing_inputs.push(sample.exp_sample_id());
            rows.push(LedgerRow::new(sample.exp_sample_id(), SampleStatus::MissingInputs));
        }
        ledger::write_ledger(&layouts.work.errors_tsv(), &rows)
    }

    /// Submit, wait for every task and return the ids of failed samples.
    async fn submit_and_wait(
        &self,
        layouts: &RunLayouts,
        sbatch: PathBuf,
        runnable: &[RowNumberedSample],
    ) -> Result<Vec<String>> {
        let work = &layouts.work;
        let mut cancel = self.cancel.clone();
        let poller = CompletionPoller {
            fs: self.fs.as_ref(),
            backend: self.backend.as_ref(),
            reporter: self.reporter.as_ref(),
            options: &self.poll,
        };

        let submission = self.backend.submit(sbatch).await?;
        let array_job_id = poller.array_job_id(&submission, work, &mut cancel).await?;
        self.reporter.submitted(&array_job_id, runnable.len());

        let outcomes = poller.wait(work, &array_job_id, runnable, &mut cancel).await?;
        migrate::finalize_task_logs(
            self.fs.as_ref(),
            self.backend.as_ref(),
            work,
            &array_job_id,
            runnable,
            &outcomes,
        )
        .await?;

        Ok(runnable
            .iter()
            .filter(|t| {
                outcomes
                    .get(&t.array_task_index())
                    .is_some_and(|o| !o.is_sample_success())
            })
            .map(|t| t.sample().exp_sample_id())
            .collect())
    }
}
