// src/experiment/ledger.rs

//! Experiment `errors.tsv`: one `sample_id<TAB>reason` row per sample that
//! did not end OK in the last run.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::Context;

use crate::errors::{BenchError, Result};
use crate::fs::{FileSystem, ops};
use crate::samples::SampleStatus;

const HEADER: &str = "sample_id\treason";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    /// Experiment sample id, `{species}_{sample}`.
    pub sample_id: String,
    /// `missing_inputs` or `error`.
    pub reason: SampleStatus,
}

impl LedgerRow {
    pub fn new(sample_id: impl Into<String>, reason: SampleStatus) -> Self {
        Self {
            sample_id: sample_id.into(),
            reason,
        }
    }

    fn to_line(&self) -> String {
        format!("{}\t{}\n", self.sample_id, self.reason)
    }
}

/// Rewrite the ledger with `rows`.
pub fn write_ledger(path: &Path, rows: &[LedgerRow]) -> Result<()> {
    let mut out = format!("{HEADER}\n");
    for row in rows {
        out.push_str(&row.to_line());
    }
    ops::write_file(path, out)?;
    Ok(())
}

/// Append `rows`, writing the header first if the ledger does not exist.
pub fn append_ledger(path: &Path, rows: &[LedgerRow]) -> Result<()> {
    if !path.exists() {
        return write_ledger(path, rows);
    }
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("opening ledger {:?}", path))?;
    for row in rows {
        file.write_all(row.to_line().as_bytes())
            .with_context(|| format!("appending to ledger {:?}", path))?;
    }
    Ok(())
}

pub fn read_ledger(fs: &dyn FileSystem, path: &Path) -> Result<Vec<LedgerRow>> {
    let contents = fs.read_to_string(path)?;
    let mut rows = Vec::new();
    for line in contents.lines().skip(1).filter(|l| !l.trim().is_empty()) {
        let Some((sample_id, reason)) = line.split_once('\t') else {
            return Err(BenchError::Other(anyhow::anyhow!(
                "malformed ledger row in {:?}: {line:?}",
                path
            )));
        };
        let reason = reason.trim().parse::<SampleStatus>().map_err(|e| {
            BenchError::Other(anyhow::anyhow!("malformed ledger row in {:?}: {e}", path))
        })?;
        rows.push(LedgerRow::new(sample_id, reason));
    }
    Ok(rows)
}
