// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::config::Settings;
use crate::config::catalog::Catalog;
use crate::config::model::{RawSettings, SchedulerSection};
use crate::errors::{BenchError, Result};
use crate::slurm::PollOptions;

/// Scheduler commands and polling cadence.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub sbatch: String,
    pub sacct: String,
    pub poll: PollOptions,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            sbatch: "sbatch".to_string(),
            sacct: "sacct".to_string(),
            poll: PollOptions::default(),
        }
    }
}

impl TryFrom<RawSettings> for Settings {
    type Error = BenchError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_settings(&raw)?;
        Ok(Settings {
            scheduler: scheduler_settings(&raw.scheduler)?,
            catalog: Catalog::from_raw(&raw),
        })
    }
}

/// Run every check that does not need the scheduler section.
pub fn validate_settings(raw: &RawSettings) -> Result<()> {
    validate_topic_references(raw)?;
    validate_unique_cmds(raw)?;
    validate_argument_results(raw)?;
    Ok(())
}

fn scheduler_settings(section: &SchedulerSection) -> Result<SchedulerSettings> {
    let interval = duration_field("poll_interval", &section.poll_interval)?;
    if interval.is_zero() {
        return Err(BenchError::ConfigError(
            "[scheduler].poll_interval must be > 0".to_string(),
        ));
    }
    let job_id_wait = duration_field("job_id_wait", &section.job_id_wait)?;
    if section.job_id_attempts == 0 {
        return Err(BenchError::ConfigError(
            "[scheduler].job_id_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(SchedulerSettings {
        sbatch: section.sbatch.clone(),
        sacct: section.sacct.clone(),
        poll: PollOptions {
            interval,
            job_id_wait,
            job_id_attempts: section.job_id_attempts,
        },
    })
}

fn duration_field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| BenchError::ConfigError(format!("[scheduler].{name}: {e}")))
}

fn validate_topic_references(raw: &RawSettings) -> Result<()> {
    for (name, tool) in &raw.tool {
        if !raw.topic.contains_key(&tool.topic) {
            return Err(BenchError::ConfigError(format!(
                "tool '{}' refers to unknown topic '{}'",
                name, tool.topic
            )));
        }
        for (arg, section) in &tool.arguments {
            if !raw.topic.contains_key(&section.topic) {
                return Err(BenchError::ConfigError(format!(
                    "argument '{}' of tool '{}' refers to unknown topic '{}'",
                    arg, name, section.topic
                )));
            }
        }
    }
    Ok(())
}

fn validate_unique_cmds(raw: &RawSettings) -> Result<()> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for (name, tool) in &raw.tool {
        let cmd = tool.cmd.as_deref().unwrap_or(name);
        if let Some(other) = seen.insert(cmd, name) {
            return Err(BenchError::ConfigError(format!(
                "tools '{}' and '{}' share the command name '{}'",
                other, name, cmd
            )));
        }
    }
    Ok(())
}

fn validate_argument_results(raw: &RawSettings) -> Result<()> {
    let mut provided: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for tool in raw.tool.values() {
        provided
            .entry(tool.topic.as_str())
            .or_default()
            .extend(tool.provides.iter().map(String::as_str));
    }
    for (name, tool) in &raw.tool {
        for (arg, section) in &tool.arguments {
            let available = provided.get(section.topic.as_str());
            if !available.is_some_and(|kinds| kinds.contains(section.result.as_str())) {
                return Err(BenchError::ConfigError(format!(
                    "argument '{}' of tool '{}' requires '{}' but no '{}' tool provides it",
                    arg, name, section.result, section.topic
                )));
            }
        }
    }
    Ok(())
}

/// Parse `"500ms"`, `"10s"`, `"5m"`, `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs = |per_unit: u64| {
        value
            .checked_mul(per_unit)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{s}' is too large"))
    };
    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => secs(60),
        "h" => secs(60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Settings> {
        let raw: RawSettings = toml::from_str(toml_src)?;
        Settings::try_from(raw)
    }

    const BASE: &str = r#"
[topic.assembly]
cmd = "asm"

[tool.unicycler]
topic = "assembly"
provides = ["fasta_gz", "gfa_gz"]
command = "unicycler"
"#;

    #[test]
    fn defaults_apply_to_missing_scheduler_section() {
        let settings = parse(BASE).unwrap();
        assert_eq!(settings.scheduler.sbatch, "sbatch");
        assert_eq!(settings.scheduler.poll.interval, Duration::from_secs(60));
        assert_eq!(settings.scheduler.poll.job_id_attempts, 30);
    }

    #[test]
    fn durations_accept_all_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("10d").is_err());
    }

    #[test]
    fn oversized_durations_are_errors_not_overflows() {
        assert!(parse_duration("18446744073709551615h").is_err());
        assert!(parse_duration("307445734561825861m").is_err());
        let src = format!("[scheduler]\npoll_interval = \"18446744073709551615h\"\n{BASE}");
        assert!(matches!(parse(&src), Err(BenchError::ConfigError(_))));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let src = format!("[scheduler]\npoll_interval = \"0s\"\n{BASE}");
        assert!(matches!(parse(&src), Err(BenchError::ConfigError(_))));
    }

    #[test]
    fn unknown_topic_is_rejected() {
        let src = format!("{BASE}\n[tool.skesa]\ntopic = \"assmbly\"\ncommand = \"skesa\"\n");
        match parse(&src) {
            Err(BenchError::ConfigError(msg)) => assert!(msg.contains("assmbly")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_cmds_are_rejected() {
        let src = format!("{BASE}\n[tool.uni2]\ntopic = \"assembly\"\ncmd = \"unicycler\"\ncommand = \"x\"\n");
        assert!(matches!(parse(&src), Err(BenchError::ConfigError(_))));
    }

    #[test]
    fn argument_kind_must_be_provided_by_the_topic() {
        let src = format!(
            "{BASE}\n[topic.plasmidness]\n\n[tool.plasbin]\ntopic = \"plasmidness\"\ncommand = \"plasbin\"\n\n[tool.plasbin.arguments.reads]\ntopic = \"assembly\"\nresult = \"fastq_gz\"\n"
        );
        match parse(&src) {
            Err(BenchError::ConfigError(msg)) => assert!(msg.contains("fastq_gz")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }
}
