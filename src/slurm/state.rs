// src/slurm/state.rs

//! Job states as reported by `sacct`.

use std::fmt;
use std::str::FromStr;

use crate::samples::SampleStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SacctState {
    BootFail,
    Cancelled,
    Completed,
    Deadline,
    Failed,
    NodeFail,
    OutOfMemory,
    Pending,
    Preempted,
    Running,
    Requeued,
    Resizing,
    Revoked,
    Suspended,
    Timeout,
}

const NAMES: [(SacctState, &str); 15] = [
    (SacctState::BootFail, "BOOT_FAIL"),
    (SacctState::Cancelled, "CANCELLED"),
    (SacctState::Completed, "COMPLETED"),
    (SacctState::Deadline, "DEADLINE"),
    (SacctState::Failed, "FAILED"),
    (SacctState::NodeFail, "NODE_FAIL"),
    (SacctState::OutOfMemory, "OUT_OF_MEMORY"),
    (SacctState::Pending, "PENDING"),
    (SacctState::Preempted, "PREEMPTED"),
    (SacctState::Running, "RUNNING"),
    (SacctState::Requeued, "REQUEUED"),
    (SacctState::Resizing, "RESIZING"),
    (SacctState::Revoked, "REVOKED"),
    (SacctState::Suspended, "SUSPENDED"),
    (SacctState::Timeout, "TIMEOUT"),
];

impl SacctState {
    pub fn as_str(&self) -> &'static str {
        NAMES
            .iter()
            .find(|(state, _)| state == self)
            .map(|(_, name)| *name)
            .unwrap_or("UNKNOWN")
    }

    /// What the state means for the sample the task was running.
    pub fn sample_status(&self) -> SampleStatus {
        match self {
            SacctState::BootFail
            | SacctState::Cancelled
            | SacctState::Deadline
            | SacctState::Failed
            | SacctState::NodeFail
            | SacctState::OutOfMemory
            | SacctState::Revoked
            | SacctState::Timeout => SampleStatus::Error,
            SacctState::Completed => SampleStatus::Ok,
            SacctState::Pending
            | SacctState::Preempted
            | SacctState::Running
            | SacctState::Requeued
            | SacctState::Resizing
            | SacctState::Suspended => SampleStatus::NotRun,
        }
    }

    /// Terminal failure: the task will never write its own sentinels.
    pub fn is_failure(&self) -> bool {
        self.sample_status() == SampleStatus::Error
    }
}

impl fmt::Display for SacctState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SacctState {
    type Err = String;

    /// Accepts decorated forms such as `CANCELLED by 1234`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let head = s.split_whitespace().next().unwrap_or("").trim_end_matches('+');
        NAMES
            .iter()
            .find(|(_, name)| *name == head)
            .map(|(state, _)| *state)
            .ok_or_else(|| format!("unknown sacct state '{}'", s.trim()))
    }
}
