// src/script/mod.rs

//! Script generation for one run.
//!
//! Four files land in the work `scripts/` directory, all prefixed by the run
//! date stamp: the sbatch array script and one script per [`Step`]. The step
//! scripts are copied to the data side as soon as they are written; the
//! sbatch script follows at migration.

pub mod command;
pub mod env_wrapper;
pub mod sbatch;
pub mod shell;

use std::path::PathBuf;

use tracing::debug;

use crate::connector::ToolScriptLines;
use crate::errors::Result;
use crate::experiment::config::ExperimentConfig;
use crate::experiment::layout::RunLayouts;
use crate::fs::ops;
use crate::samples::{ManifestColumns, RowNumberedSample};
use crate::slurm::Step;

pub use env_wrapper::EnvWrapper;

/// Inputs of script generation, resolved by the runner.
#[derive(Debug, Clone, Copy)]
pub struct ScriptInputs<'a> {
    pub layouts: &'a RunLayouts,
    pub wrapper: &'a EnvWrapper,
    pub config: &'a ExperimentConfig,
    pub columns: ManifestColumns,
    pub tool_lines: &'a ToolScriptLines,
    pub samples: &'a [RowNumberedSample],
}

/// Write every script of the run and return the sbatch script path.
pub fn write_run_scripts(inputs: &ScriptInputs<'_>) -> Result<PathBuf> {
    let RunLayouts {
        data,
        work,
        date_stamp,
    } = inputs.layouts;
    ops::ensure_dir(&work.scripts_dir())?;
    ops::ensure_dir(&data.scripts_dir())?;

    for step in Step::ALL {
        let body = match step {
            Step::InitEnv => join_lines(inputs.wrapper.init_env_lines()),
            Step::Command => command::command_script(
                data,
                work,
                inputs.columns,
                inputs.config,
                inputs.tool_lines,
            ),
            Step::CloseEnv => join_lines(inputs.wrapper.close_env_lines()),
        };
        let path = work.step_script(date_stamp, step);
        ops::write_file(&path, body)?;
        ops::make_executable(&path)?;
        ops::copy_file(&path, &data.step_script(date_stamp, step))?;
        debug!(%step, path = ?path, "wrote step script");
    }

    let sbatch = work.sbatch_script(date_stamp);
    ops::write_file(
        &sbatch,
        sbatch::sbatch_script(work, date_stamp, inputs.samples, &inputs.config.slurm),
    )?;
    debug!(path = ?sbatch, tasks = inputs.samples.len(), "wrote sbatch script");
    Ok(sbatch)
}

fn join_lines(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
