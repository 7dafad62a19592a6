mod common;
use crate::common::builders::{fast_poll, run_request, unicycler, unicycler_connector, write_config, write_env_wrapper, write_manifest};
use crate::common::{Sandbox, init_tracing};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use slurmbench::errors::BenchError;
use slurmbench::experiment::{ExperimentConfig, ExperimentRunner};
use slurmbench_test_utils::{FakeSlurm, FakeTask, RecordingReporter, ReportEvent, with_timeout};

#[tokio::test]
async fn cancel_stops_polling_and_keeps_the_work_tree() {
    init_tracing();
    let sandbox = Sandbox::new();
    write_manifest(&sandbox.data_root, &[("sp1", "s1"), ("sp1", "s2")]).unwrap();
    let layouts = sandbox.layouts(unicycler(), "asm");
    write_env_wrapper(&layouts.data).unwrap();
    let config_path = write_config(&sandbox.configs, &ExperimentConfig::new("asm")).unwrap();

    let backend = Arc::new(
        FakeSlurm::new("600")
            .with_task(2, FakeTask::Never)
            .with_task(3, FakeTask::Success),
    );
    let reporter = Arc::new(RecordingReporter::new());
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = cancel_tx.send(true);
    });

    let result = with_timeout(
        ExperimentRunner::new(backend.clone())
            .with_poll_options(fast_poll())
            .with_reporter(reporter.clone())
            .with_cancel(cancel_rx)
            .run(
                &unicycler_connector(),
                &run_request(&sandbox.data_root, &sandbox.work_root, &config_path),
            ),
    )
    .await;

    assert!(matches!(result, Err(BenchError::PollCancelled)));
    assert_eq!(backend.submissions().len(), 1);

    // The finished task was observed, the pending one was not.
    let finished = reporter.finished_tasks();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].0, "sp1_s2");
    assert!(!reporter
        .events()
        .iter()
        .any(|e| matches!(e, ReportEvent::RunFinished(_))));

    // Nothing migrated; the work side stays for inspection.
    assert!(layouts.work.exp_dir().is_dir());
    assert!(!layouts.data.sample_dir(&slurmbench::samples::Sample::new("sp1", "s2")).exists());
}

#[tokio::test]
async fn cancel_while_waiting_for_the_job_id_file() {
    init_tracing();
    let sandbox = Sandbox::new();
    write_manifest(&sandbox.data_root, &[("sp1", "s1")]).unwrap();
    let layouts = sandbox.layouts(unicycler(), "asm");
    write_env_wrapper(&layouts.data).unwrap();
    let config_path = write_config(&sandbox.configs, &ExperimentConfig::new("asm")).unwrap();

    // No task starts and sbatch prints nothing: the id never shows up.
    let backend = Arc::new(FakeSlurm::new("601").silent_sbatch().with_task(2, FakeTask::Never));
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut poll = fast_poll();
    poll.job_id_attempts = u32::MAX;

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = cancel_tx.send(true);
    });

    let result = with_timeout(
        ExperimentRunner::new(backend)
            .with_poll_options(poll)
            .with_cancel(cancel_rx)
            .run(
                &unicycler_connector(),
                &run_request(&sandbox.data_root, &sandbox.work_root, &config_path),
            ),
    )
    .await;

    assert!(matches!(result, Err(BenchError::PollCancelled)));
}

#[tokio::test]
async fn job_id_file_that_never_appears_is_a_scheduler_error() {
    init_tracing();
    let sandbox = Sandbox::new();
    write_manifest(&sandbox.data_root, &[("sp1", "s1")]).unwrap();
    let layouts = sandbox.layouts(unicycler(), "asm");
    write_env_wrapper(&layouts.data).unwrap();
    let config_path = write_config(&sandbox.configs, &ExperimentConfig::new("asm")).unwrap();

    let backend = Arc::new(FakeSlurm::new("602").silent_sbatch().with_task(2, FakeTask::Never));
    let mut poll = fast_poll();
    poll.job_id_attempts = 3;

    let result = with_timeout(
        ExperimentRunner::new(backend).with_poll_options(poll).run(
            &unicycler_connector(),
            &run_request(&sandbox.data_root, &sandbox.work_root, &config_path),
        ),
    )
    .await;

    assert!(matches!(result, Err(BenchError::Scheduler(msg)) if msg.contains("array job id file")));
}
