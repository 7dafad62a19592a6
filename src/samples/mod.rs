// src/samples/mod.rs

//! Samples, the manifest they are read from, and their on-disk status.

pub mod manifest;
pub mod missing_inputs;
pub mod status;

use std::fmt;

pub use manifest::{Manifest, ManifestColumns, read_manifest, samples_tsv};
pub use missing_inputs::MissingInput;
pub use status::{SampleStatus, status};

/// A sample of the manifest, identified by species and sample id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sample {
    pub species_id: String,
    pub sample_id: String,
}

impl Sample {
    pub fn new(species_id: impl Into<String>, sample_id: impl Into<String>) -> Self {
        Self {
            species_id: species_id.into(),
            sample_id: sample_id.into(),
        }
    }

    /// Per-sample directory name: `{species}_{sample}`.
    pub fn exp_sample_id(&self) -> String {
        format!("{}_{}", self.species_id, self.sample_id)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.species_id, self.sample_id)
    }
}

/// A sample together with its 1-based line in `samples.tsv`.
///
/// The header is line 1, so the first sample sits on line 2. The line
/// number is also the SLURM array task index of the sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowNumberedSample {
    line_number: usize,
    sample: Sample,
}

impl RowNumberedSample {
    pub fn new(line_number: usize, sample: Sample) -> Self {
        Self {
            line_number,
            sample,
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn array_task_index(&self) -> usize {
        self.line_number
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }
}
