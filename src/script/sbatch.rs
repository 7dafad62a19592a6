// src/script/sbatch.rs

//! The SLURM array submission script.
//!
//! Each array task records the array job id (first writer wins), then runs
//! the three steps in order. A failing step touches its `.ERROR` sentinel
//! and exits; a passing one touches `.OK`. The last line touches the end
//! sentinel.

use crate::experiment::layout::ExperimentLayout;
use crate::samples::RowNumberedSample;
use crate::script::shell;
use crate::slurm::steps::{END_SENTINEL_STEM, Step};

pub const SBATCH_COMMENT: &str = "#SBATCH";
pub const JOB_ID_VAR: &str = "JOB_ID";
pub const LOGS_DIR_VAR: &str = "LOGS_DIR";
pub const ARRAY_JOB_ID_FILE_VAR: &str = "ARRAY_JOB_ID_FILE";

/// `{topic}_{tool}_{experiment}`
pub fn job_name(work: &ExperimentLayout) -> String {
    format!(
        "{}_{}_{}",
        work.tool().topic().name(),
        work.tool().name(),
        work.experiment_name()
    )
}

/// `#SBATCH` directives; the array lists the manifest line numbers.
pub fn directives(work: &ExperimentLayout, samples: &[RowNumberedSample], user: &[String]) -> Vec<String> {
    let indices: Vec<String> = samples
        .iter()
        .map(|s| s.array_task_index().to_string())
        .collect();
    // sbatch expands %A and %a to the array job id and task index.
    let log_job_id = "%A_%a";
    let mut lines = vec![
        format!("--job-name={}", job_name(work)),
        format!("--array={}", indices.join(",")),
        format!("--output={}", work.stdout_log(log_job_id).display()),
        format!("--error={}", work.stderr_log(log_job_id).display()),
    ];
    lines.extend(user.iter().cloned());
    lines
        .into_iter()
        .map(|l| format!("{SBATCH_COMMENT} {l}"))
        .collect()
}

pub fn sbatch_script(
    work: &ExperimentLayout,
    date_stamp: &str,
    samples: &[RowNumberedSample],
    user_directives: &[String],
) -> String {
    let mut lines = vec![shell::SHEBANG.to_string()];
    lines.extend(directives(work, samples, user_directives));
    lines.push(String::new());

    lines.push(format!(
        "{JOB_ID_VAR}=\"${{SLURM_ARRAY_JOB_ID}}_${{SLURM_ARRAY_TASK_ID}}\""
    ));
    lines.push(format!("{LOGS_DIR_VAR}={}", shell::quote_path(&work.logs_dir())));
    lines.push(format!(
        "{ARRAY_JOB_ID_FILE_VAR}={}",
        shell::quote_path(&work.array_job_id_file())
    ));
    lines.push(String::new());

    lines.push(format!("if [ ! -f \"${{{ARRAY_JOB_ID_FILE_VAR}}}\" ]; then"));
    lines.push(format!(
        "    echo \"${{SLURM_ARRAY_JOB_ID}}\" > \"${{{ARRAY_JOB_ID_FILE_VAR}}}.${{SLURM_ARRAY_TASK_ID}}.tmp\""
    ));
    lines.push(format!(
        "    mv -n \"${{{ARRAY_JOB_ID_FILE_VAR}}}.${{SLURM_ARRAY_TASK_ID}}.tmp\" \"${{{ARRAY_JOB_ID_FILE_VAR}}}\""
    ));
    lines.push(format!(
        "    rm -f \"${{{ARRAY_JOB_ID_FILE_VAR}}}.${{SLURM_ARRAY_TASK_ID}}.tmp\""
    ));
    lines.push("fi".to_string());
    lines.push(String::new());

    lines.push(format!(
        "step_ok() {{ touch \"${{{LOGS_DIR_VAR}}}/${{{JOB_ID_VAR}}}_$1.OK\"; }}"
    ));
    lines.push(format!(
        "step_error() {{ touch \"${{{LOGS_DIR_VAR}}}/${{{JOB_ID_VAR}}}_$1.ERROR\"; exit 1; }}"
    ));
    lines.push(String::new());

    for step in Step::ALL {
        let script = shell::quote_path(&work.step_script(date_stamp, step));
        let run = match step {
            Step::Command => format!("bash {script}"),
            Step::InitEnv | Step::CloseEnv => format!("source {script}"),
        };
        lines.push(format!("{run} || step_error {step}"));
        lines.push(format!("step_ok {step}"));
    }
    lines.push(String::new());
    lines.push(format!(
        "touch \"${{{LOGS_DIR_VAR}}}/${{{JOB_ID_VAR}}}_{END_SENTINEL_STEM}.OK\""
    ));

    let mut script = lines.join("\n");
    script.push('\n');
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::Sample;
    use crate::types::{ToolDescription, TopicDescription};

    fn work() -> ExperimentLayout {
        let tool = ToolDescription::new("unicycler", "uni", TopicDescription::new("assembly", "asm"));
        ExperimentLayout::work("/w", tool, "e")
    }

    fn samples() -> Vec<RowNumberedSample> {
        vec![
            RowNumberedSample::new(2, Sample::new("sp", "a")),
            RowNumberedSample::new(5, Sample::new("sp", "d")),
        ]
    }

    #[test]
    fn directives_list_line_numbers_and_logs() {
        let lines = directives(&work(), &samples(), &["--mem=4G".to_string()]);
        assert_eq!(
            lines,
            vec![
                "#SBATCH --job-name=assembly_unicycler_e",
                "#SBATCH --array=2,5",
                "#SBATCH --output=/w/assembly/unicycler/e/logs/%A_%a_stdout.log",
                "#SBATCH --error=/w/assembly/unicycler/e/logs/%A_%a_stderr.log",
                "#SBATCH --mem=4G",
            ]
        );
    }

    #[test]
    fn steps_run_in_order_and_end_with_the_end_sentinel() {
        let script = sbatch_script(&work(), "2024-01-01_00-00-00", &samples(), &[]);
        let init = script.find("_init_env.sh' || step_error init_env").unwrap();
        let command = script.find("bash '/w/assembly/unicycler/e/scripts/2024-01-01_00-00-00_command.sh'").unwrap();
        let close = script.find("_close_env.sh' || step_error close_env").unwrap();
        assert!(init < command && command < close);
        assert!(script.trim_end().ends_with(r#"touch "${LOGS_DIR}/${JOB_ID}_end.OK""#));
        assert!(script.contains("LOGS_DIR='/w/assembly/unicycler/e/logs'"));
        assert!(script.contains("ARRAY_JOB_ID_FILE='/w/assembly/unicycler/e/logs/array_job.id'"));
    }
}
