mod common;
use crate::common::builders::{
    fast_poll, mark_done, plasbin_config, plasbin_connector, run_request, unicycler, unicycler_connector,
    write_config, write_env_wrapper, write_manifest,
};
use crate::common::{Sandbox, init_tracing};

use std::sync::Arc;

use slurmbench::experiment::ExperimentConfig;
use slurmbench::experiment::ledger::{LedgerRow, read_ledger};
use slurmbench::fs::RealFileSystem;
use slurmbench::samples::missing_inputs::read_missing_inputs;
use slurmbench::samples::{Sample, SampleStatus, status};
use slurmbench::slurm::{SacctState, TaskOutcome};
use slurmbench_test_utils::{FakeSlurm, FakeTask, RecordingReporter, ReportEvent, with_timeout};

fn s1() -> Sample {
    Sample::new("sp1", "s1")
}

fn s2() -> Sample {
    Sample::new("sp1", "s2")
}

/// Manifest with two samples, unicycler env wrapper and an `asm` config.
fn unicycler_sandbox() -> (Sandbox, std::path::PathBuf) {
    let sandbox = Sandbox::new();
    write_manifest(&sandbox.data_root, &[("sp1", "s1"), ("sp1", "s2")]).unwrap();
    let layouts = sandbox.layouts(unicycler(), "asm");
    write_env_wrapper(&layouts.data).unwrap();
    let mut config = ExperimentConfig::new("asm");
    config.tool.options = vec!["--mode".to_string(), "bold".to_string()];
    config.slurm = vec!["--mem=8G".to_string()];
    let config_path = write_config(&sandbox.configs, &config).unwrap();
    (sandbox, config_path)
}

#[tokio::test]
async fn fresh_run_moves_every_sample_to_data() {
    init_tracing();
    let (sandbox, config_path) = unicycler_sandbox();
    let backend = Arc::new(FakeSlurm::new("812"));
    let reporter = Arc::new(RecordingReporter::new());

    let stats = with_timeout(
        slurmbench::experiment::ExperimentRunner::new(backend.clone())
            .with_poll_options(fast_poll())
            .with_reporter(reporter.clone())
            .run(
                &unicycler_connector(),
                &run_request(&sandbox.data_root, &sandbox.work_root, &config_path),
            ),
    )
    .await
    .unwrap();

    assert_eq!(stats.number_of_samples, 2);
    assert_eq!(stats.number_of_samples_to_run, 2);
    assert_eq!(stats.number_of_successful(), 2);
    assert!(stats.samples_with_errors.is_empty());

    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].indices, vec![2, 3]);
    assert!(submissions[0].directives.contains(&"--mem=8G".to_string()));
    assert!(submissions[0]
        .directives
        .contains(&"--job-name=assembly_unicycler_asm".to_string()));

    let layouts = sandbox.layouts(unicycler(), "asm");
    let data = &layouts.data;
    for sample in [s1(), s2()] {
        assert_eq!(status(&RealFileSystem, &data.sample_dir(&sample)), SampleStatus::Ok);
        assert!(data.sample_stdout_log(&sample).is_file());
        assert!(data.sample_job_state(&sample, SacctState::Completed).is_file());
        assert!(data.sample_stats_psv(&sample).is_file());
        let steps = std::fs::read_to_string(data.sample_steps_status(&sample)).unwrap();
        assert!(steps.contains("close_env: OK"));
    }
    assert!(data.config_yaml().is_file());
    assert!(data.date_txt().is_file());
    let scripts: Vec<_> = std::fs::read_dir(data.scripts_dir()).unwrap().collect();
    assert_eq!(scripts.len(), 4, "sbatch plus three step scripts");
    assert!(read_ledger(&RealFileSystem, &data.errors_tsv()).unwrap().is_empty());

    assert!(!layouts.work.exp_dir().exists());

    let events = reporter.events();
    assert!(matches!(
        events.first(),
        Some(ReportEvent::Submitted { array_job_id, tasks: 2 }) if array_job_id == "812"
    ));
    assert!(matches!(events.last(), Some(ReportEvent::RunFinished(_))));
}

#[tokio::test]
async fn second_run_submits_nothing_when_all_samples_are_done() {
    init_tracing();
    let (sandbox, config_path) = unicycler_sandbox();
    let request = run_request(&sandbox.data_root, &sandbox.work_root, &config_path);

    let first = Arc::new(FakeSlurm::new("1"));
    slurmbench::experiment::ExperimentRunner::new(first)
        .with_poll_options(fast_poll())
        .run(&unicycler_connector(), &request)
        .await
        .unwrap();

    let second = Arc::new(FakeSlurm::new("2"));
    let stats = slurmbench::experiment::ExperimentRunner::new(second.clone())
        .with_poll_options(fast_poll())
        .run(&unicycler_connector(), &request)
        .await
        .unwrap();

    assert_eq!(stats.number_of_samples_to_run, 0);
    assert_eq!(stats.number_of_already_done(), 2);
    assert!(second.submissions().is_empty());
}

#[tokio::test]
async fn failed_sample_is_resubmitted_alone() {
    init_tracing();
    let (sandbox, config_path) = unicycler_sandbox();
    let request = run_request(&sandbox.data_root, &sandbox.work_root, &config_path);
    let layouts = sandbox.layouts(unicycler(), "asm");

    let first = Arc::new(FakeSlurm::new("31").with_task(3, FakeTask::CommandError));
    let stats = slurmbench::experiment::ExperimentRunner::new(first)
        .with_poll_options(fast_poll())
        .run(&unicycler_connector(), &request)
        .await
        .unwrap();

    assert_eq!(stats.samples_with_errors, vec!["sp1_s2".to_string()]);
    assert_eq!(
        status(&RealFileSystem, &layouts.data.sample_dir(&s2())),
        SampleStatus::Error
    );
    assert!(layouts.data.sample_job_state(&s2(), SacctState::Failed).is_file());
    assert_eq!(
        read_ledger(&RealFileSystem, &layouts.data.errors_tsv()).unwrap(),
        vec![LedgerRow::new("sp1_s2", SampleStatus::Error)]
    );

    let second = Arc::new(FakeSlurm::new("32"));
    let stats = slurmbench::experiment::ExperimentRunner::new(second.clone())
        .with_poll_options(fast_poll())
        .run(&unicycler_connector(), &request)
        .await
        .unwrap();

    assert_eq!(stats.number_of_samples_to_run, 1);
    assert_eq!(second.submissions()[0].indices, vec![3]);
    assert_eq!(
        status(&RealFileSystem, &layouts.data.sample_dir(&s2())),
        SampleStatus::Ok
    );
    assert!(read_ledger(&RealFileSystem, &layouts.data.errors_tsv()).unwrap().is_empty());
}

#[tokio::test]
async fn close_env_error_still_counts_as_done() {
    init_tracing();
    let (sandbox, config_path) = unicycler_sandbox();
    let backend = Arc::new(FakeSlurm::new("40").with_task(2, FakeTask::CloseEnvError));
    let reporter = Arc::new(RecordingReporter::new());

    let stats = slurmbench::experiment::ExperimentRunner::new(backend)
        .with_poll_options(fast_poll())
        .with_reporter(reporter.clone())
        .run(
            &unicycler_connector(),
            &run_request(&sandbox.data_root, &sandbox.work_root, &config_path),
        )
        .await
        .unwrap();

    assert!(stats.samples_with_errors.is_empty());
    let layouts = sandbox.layouts(unicycler(), "asm");
    assert_eq!(
        status(&RealFileSystem, &layouts.data.sample_dir(&s1())),
        SampleStatus::Ok
    );
    let steps = std::fs::read_to_string(layouts.data.sample_steps_status(&s1())).unwrap();
    assert!(steps.contains("close_env: ERROR"));
    assert!(reporter
        .finished_tasks()
        .contains(&("sp1_s1".to_string(), TaskOutcome::CloseEnvError)));
}

#[tokio::test]
async fn scheduler_killed_task_becomes_an_error() {
    init_tracing();
    let (sandbox, config_path) = unicycler_sandbox();
    let backend = Arc::new(
        FakeSlurm::new("50").with_task(2, FakeTask::SchedulerKill(SacctState::Timeout)),
    );
    let reporter = Arc::new(RecordingReporter::new());

    let stats = with_timeout(
        slurmbench::experiment::ExperimentRunner::new(backend)
            .with_poll_options(fast_poll())
            .with_reporter(reporter.clone())
            .run(
                &unicycler_connector(),
                &run_request(&sandbox.data_root, &sandbox.work_root, &config_path),
            ),
    )
    .await
    .unwrap();

    assert_eq!(stats.samples_with_errors, vec!["sp1_s1".to_string()]);
    let layouts = sandbox.layouts(unicycler(), "asm");
    assert_eq!(
        status(&RealFileSystem, &layouts.data.sample_dir(&s1())),
        SampleStatus::Error
    );
    assert!(layouts.data.sample_job_state(&s1(), SacctState::Timeout).is_file());
    assert!(reporter.finished_tasks().contains(&(
        "sp1_s1".to_string(),
        TaskOutcome::SchedulerFailed(SacctState::Timeout)
    )));
}

#[tokio::test]
async fn array_job_id_is_read_from_the_id_file_when_sbatch_is_silent() {
    init_tracing();
    let (sandbox, config_path) = unicycler_sandbox();
    let backend = Arc::new(FakeSlurm::new("77").silent_sbatch());
    let reporter = Arc::new(RecordingReporter::new());

    let stats = with_timeout(
        slurmbench::experiment::ExperimentRunner::new(backend)
            .with_poll_options(fast_poll())
            .with_reporter(reporter.clone())
            .run(
                &unicycler_connector(),
                &run_request(&sandbox.data_root, &sandbox.work_root, &config_path),
            ),
    )
    .await
    .unwrap();

    assert_eq!(stats.number_of_successful(), 2);
    assert!(matches!(
        reporter.events().first(),
        Some(ReportEvent::Submitted { array_job_id, .. }) if array_job_id == "77"
    ));
}

#[tokio::test]
async fn samples_with_unusable_inputs_are_not_submitted() {
    init_tracing();
    let sandbox = Sandbox::new();
    write_manifest(&sandbox.data_root, &[("sp1", "s1"), ("sp1", "s2")]).unwrap();

    // Upstream assembly: s1 done, s2 never ran.
    let upstream = sandbox.layouts(unicycler(), "asm");
    mark_done(&upstream.data, &s1()).unwrap();

    let connector = plasbin_connector();
    let layouts = sandbox.layouts(connector.description().clone(), "plb");
    write_env_wrapper(&layouts.data).unwrap();
    let config_path = write_config(&sandbox.configs, &plasbin_config("plb", "unicycler", "asm")).unwrap();
    let backend = Arc::new(FakeSlurm::new("90"));

    let stats = slurmbench::experiment::ExperimentRunner::new(backend.clone())
        .with_poll_options(fast_poll())
        .run(
            &connector,
            &run_request(&sandbox.data_root, &sandbox.work_root, &config_path),
        )
        .await
        .unwrap();

    assert_eq!(stats.samples_with_missing_inputs, vec!["sp1_s2".to_string()]);
    assert_eq!(stats.number_of_submitted(), 1);
    assert_eq!(backend.submissions()[0].indices, vec![2]);

    let data = &layouts.data;
    assert_eq!(status(&RealFileSystem, &data.sample_dir(&s1())), SampleStatus::Ok);
    assert_eq!(
        status(&RealFileSystem, &data.sample_dir(&s2())),
        SampleStatus::MissingInputs
    );
    let missing = read_missing_inputs(&RealFileSystem, &data.missing_inputs_tsv(&s2())).unwrap();
    assert_eq!(missing.len(), 2, "one row per argument");
    assert!(missing.iter().all(|m| m.reason == SampleStatus::NotRun));
    assert!(missing.iter().all(|m| m.help == "slurmbench run unicycler --help"));
    assert_eq!(
        read_ledger(&RealFileSystem, &data.errors_tsv()).unwrap(),
        vec![LedgerRow::new("sp1_s2", SampleStatus::MissingInputs)]
    );

    // The command script exports both inputs.
    let command_scripts: Vec<String> = std::fs::read_dir(data.scripts_dir())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.to_string_lossy().ends_with("_command.sh"))
        .map(|p| std::fs::read_to_string(p).unwrap())
        .collect();
    assert_eq!(command_scripts.len(), 1);
    assert!(command_scripts[0].contains("FASTA="));
    assert!(command_scripts[0].contains("GRAPH="));
}
