// src/logging.rs

//! Diagnostics go to stderr through a `tracing-subscriber` fmt layer; stdout
//! is left to the `status` and `tools` listings.
//!
//! `--log-level` wins over `SLURMBENCH_LOG`. The variable takes full
//! `EnvFilter` directives, so `SLURMBENCH_LOG=slurmbench::slurm=debug,warn`
//! traces the poller without the rest of the run. Unset or unparsable
//! values fall back to `info`.

use anyhow::{Result, anyhow};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "SLURMBENCH_LOG";
const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let directives = filter_directives(cli_level, env_value.as_deref());
    let (filter, rejected) = match EnvFilter::try_new(&directives) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_DIRECTIVES), Some(e)),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))?;

    if let Some(e) = rejected {
        warn!(var = LOG_ENV_VAR, value = %directives, error = %e, "bad log filter, using info");
    }
    Ok(())
}

fn filter_directives(cli_level: Option<LogLevel>, env_value: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level_name(level).to_string();
    }
    match env_value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_lowercase(),
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_overrides_the_environment() {
        assert_eq!(
            filter_directives(Some(LogLevel::Trace), Some("slurmbench=warn")),
            "trace"
        );
    }

    #[test]
    fn environment_directives_pass_through() {
        assert_eq!(
            filter_directives(None, Some(" slurmbench::slurm=DEBUG,warn ")),
            "slurmbench::slurm=debug,warn"
        );
        assert!(EnvFilter::try_new(filter_directives(None, Some("slurmbench::slurm=debug,warn"))).is_ok());
    }

    #[test]
    fn missing_or_blank_environment_means_info() {
        assert_eq!(filter_directives(None, None), "info");
        assert_eq!(filter_directives(None, Some("  ")), "info");
    }

    #[test]
    fn unparsable_directives_are_rejected_by_the_filter() {
        assert!(EnvFilter::try_new(filter_directives(None, Some("slurmbench=loud"))).is_err());
    }
}
