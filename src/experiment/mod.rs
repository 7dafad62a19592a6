// src/experiment/mod.rs

//! One experiment: a tool run with one config over every manifest sample.
//!
//! - [`layout`]: data and work paths.
//! - [`config`]: the YAML experiment config.
//! - [`checks`]: pre-run guards and sample selection.
//! - [`run`]: the orchestrator.
//! - [`migrate`]: work-to-data reconciliation.
//! - [`ledger`]: the experiment `errors.tsv`.

pub mod checks;
pub mod config;
pub mod layout;
pub mod ledger;
pub mod migrate;
pub mod run;
pub mod stats;

pub use config::{Argument, ExperimentConfig};
pub use layout::{ExperimentLayout, LayoutKind, RunLayouts};
pub use run::{ExperimentRunner, RunRequest};
pub use stats::RunStats;
