// src/experiment/stats.rs

use serde::Serialize;

/// Outcome counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Rows in the manifest.
    pub number_of_samples: usize,
    /// Samples that were not OK when the run started.
    pub number_of_samples_to_run: usize,
    /// Blocked before submission, by experiment sample id.
    pub samples_with_missing_inputs: Vec<String>,
    /// Submitted and failed, by experiment sample id.
    pub samples_with_errors: Vec<String>,
}

impl RunStats {
    pub fn number_of_already_done(&self) -> usize {
        self.number_of_samples
            .saturating_sub(self.number_of_samples_to_run)
    }

    pub fn number_of_submitted(&self) -> usize {
        self.number_of_samples_to_run
            .saturating_sub(self.samples_with_missing_inputs.len())
    }

    pub fn number_of_successful(&self) -> usize {
        self.number_of_submitted()
            .saturating_sub(self.samples_with_errors.len())
    }
}
