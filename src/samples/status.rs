// src/samples/status.rs

//! Sample status derived from sentinel files.
//!
//! A sample directory is a small state machine whose state is encoded by
//! which sentinel file it holds. The writers keep the sentinels mutually
//! exclusive; the reader still resolves overlaps through one precedence
//! table so the order is defined in a single place.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::fs::FileSystem;

pub const DONE_LOG: &str = "done.log";
pub const ERRORS_LOG: &str = "errors.log";
pub const MISSING_INPUTS_TSV: &str = "missing_inputs.tsv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Ok,
    NotRun,
    MissingInputs,
    Error,
}

/// Sentinels in the order they are checked; first match wins.
const SENTINEL_PRECEDENCE: [(&str, SampleStatus); 3] = [
    (MISSING_INPUTS_TSV, SampleStatus::MissingInputs),
    (ERRORS_LOG, SampleStatus::Error),
    (DONE_LOG, SampleStatus::Ok),
];

/// Status of the sample stored in `sample_dir`.
pub fn status(fs: &dyn FileSystem, sample_dir: &Path) -> SampleStatus {
    if !fs.is_dir(sample_dir) {
        return SampleStatus::NotRun;
    }
    SENTINEL_PRECEDENCE
        .iter()
        .find(|(file, _)| fs.exists(&sample_dir.join(file)))
        .map(|(_, status)| *status)
        .unwrap_or(SampleStatus::NotRun)
}

impl SampleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleStatus::Ok => "ok",
            SampleStatus::NotRun => "not_run",
            SampleStatus::MissingInputs => "missing_inputs",
            SampleStatus::Error => "error",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SampleStatus::Ok)
    }
}

impl fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ok" => Ok(SampleStatus::Ok),
            "not_run" => Ok(SampleStatus::NotRun),
            "missing_inputs" => Ok(SampleStatus::MissingInputs),
            "error" => Ok(SampleStatus::Error),
            other => Err(format!("unknown sample status '{other}'")),
        }
    }
}
