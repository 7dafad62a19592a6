// src/lib.rs

pub mod cli;
pub mod config;
pub mod connector;
pub mod errors;
pub mod experiment;
pub mod fs;
pub mod logging;
pub mod report;
pub mod samples;
pub mod script;
pub mod slurm;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::Settings;
use crate::config::loader::load_and_validate;
use crate::experiment::checks::status_summary;
use crate::experiment::{ExperimentLayout, ExperimentRunner, RunRequest};
use crate::fs::{RealFileSystem, ops};
use crate::samples::read_manifest;
use crate::slurm::SlurmBackend;

/// High-level entry point used by `main.rs`.
///
/// Loads the settings file, then dispatches the subcommand.
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = load_and_validate(&args.settings)
        .with_context(|| format!("loading settings {:?}", args.settings))?;
    debug!(tools = settings.catalog.connectors().count(), "settings loaded");

    match args.command {
        Command::Run {
            tool,
            data_dir,
            work_dir,
            config,
        } => {
            let request = RunRequest {
                data_root: data_dir,
                work_root: work_dir,
                config_path: config,
            };
            run_experiment(&settings, &tool, request).await
        }
        Command::Status {
            tool,
            data_dir,
            experiment,
        } => print_status(&settings, &tool, &data_dir, &experiment),
        Command::DraftConfig {
            tool,
            experiment,
            output,
        } => draft_config(&settings, &tool, &experiment, output),
        Command::Tools => {
            print_tools(&settings);
            Ok(())
        }
    }
}

async fn run_experiment(settings: &Settings, tool: &str, request: RunRequest) -> Result<()> {
    let connector = settings.catalog.get(tool)?;
    let scheduler = &settings.scheduler;
    let backend = Arc::new(SlurmBackend::new(&scheduler.sbatch, &scheduler.sacct));

    // Ctrl-C stops polling; submitted jobs keep running.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received, stopping observation");
        let _ = cancel_tx.send(true);
    });

    let runner = ExperimentRunner::new(backend)
        .with_poll_options(scheduler.poll.clone())
        .with_cancel(cancel_rx);
    let stats = runner.run(connector, &request).await?;

    println!("{}", serde_yaml::to_string(&stats)?);
    Ok(())
}

fn print_status(settings: &Settings, tool: &str, data_dir: &Path, experiment: &str) -> Result<()> {
    let connector = settings.catalog.get(tool)?;
    let layout = ExperimentLayout::data(data_dir, connector.description().clone(), experiment);
    let manifest = read_manifest(&RealFileSystem, &layout.samples_tsv())?;
    let summary = status_summary(&RealFileSystem, &layout, &manifest);

    println!("{} ({} samples)", layout.exp_dir().display(), manifest.samples.len());
    for (status, samples) in &summary {
        println!("  {status}: {}", samples.len());
        for sample in samples {
            println!("    {}", sample.sample().exp_sample_id());
        }
    }
    Ok(())
}

fn draft_config(settings: &Settings, tool: &str, experiment: &str, output: PathBuf) -> Result<()> {
    let connector = settings.catalog.get(tool)?;
    ops::write_file(&output, connector.draft_config(experiment))?;
    info!(path = ?output, "wrote draft experiment config");
    Ok(())
}

fn print_tools(settings: &Settings) {
    println!("tools ({}):", settings.catalog.connectors().count());
    for connector in settings.catalog.connectors() {
        let description = connector.description();
        println!(
            "  - {} ({}), topic {}",
            description.cmd(),
            description.name(),
            description.topic().name()
        );
        for argument in connector.arguments() {
            let tools: Vec<&str> = argument.tools().names().collect();
            println!(
                "      {}: {} from [{}]",
                argument.name(),
                argument.requirement().kind(),
                tools.join(", ")
            );
        }
    }
}
