// src/samples/manifest.rs

//! `samples.tsv` reader.
//!
//! ```text
//! species_id<TAB>sample_id
//! ecoli<TAB>s01
//! ```

use std::path::{Path, PathBuf};

use crate::errors::{BenchError, Result};
use crate::fs::FileSystem;
use crate::samples::{RowNumberedSample, Sample};

pub const SAMPLES_TSV: &str = "samples.tsv";
pub const SPECIES_ID_COLUMN: &str = "species_id";
pub const SAMPLE_ID_COLUMN: &str = "sample_id";

/// The manifest lives at the root of the data directory.
pub fn samples_tsv(data_root: &Path) -> PathBuf {
    data_root.join(SAMPLES_TSV)
}

/// 0-based column positions of the id columns.
///
/// Generated scripts use them with `cut -f<col+1>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestColumns {
    pub species_id: usize,
    pub sample_id: usize,
}

impl Default for ManifestColumns {
    fn default() -> Self {
        Self {
            species_id: 0,
            sample_id: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub columns: ManifestColumns,
    pub samples: Vec<RowNumberedSample>,
}

pub fn read_manifest(fs: &dyn FileSystem, path: &Path) -> Result<Manifest> {
    let contents = fs.read_to_string(path)?;
    parse_manifest(&contents, path)
}

fn parse_manifest(contents: &str, path: &Path) -> Result<Manifest> {
    let invalid = |reason: String| BenchError::Manifest {
        path: path.to_path_buf(),
        reason,
    };

    let mut lines = contents.lines();
    let header = lines
        .next()
        .ok_or_else(|| invalid("empty file, expected a header".to_string()))?;
    let header: Vec<&str> = header.split('\t').map(str::trim).collect();
    let column = |name: &str| {
        header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| invalid(format!("missing column '{name}'")))
    };
    let columns = ManifestColumns {
        species_id: column(SPECIES_ID_COLUMN)?,
        sample_id: column(SAMPLE_ID_COLUMN)?,
    };

    let mut samples = Vec::new();
    for (idx, line) in lines.enumerate() {
        // Header is line 1.
        let line_number = idx + 2;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let field = |col: usize| {
            fields
                .get(col)
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .ok_or_else(|| invalid(format!("line {line_number}: missing field {}", col + 1)))
        };
        let sample = Sample::new(field(columns.species_id)?, field(columns.sample_id)?);
        samples.push(RowNumberedSample::new(line_number, sample));
    }

    Ok(Manifest {
        path: path.to_path_buf(),
        columns,
        samples,
    })
}
