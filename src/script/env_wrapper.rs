// src/script/env_wrapper.rs

//! Tool environment wrapper split into its init and close halves.
//!
//! The wrapper is an ordinary bash file with three marker lines:
//!
//! ```bash
//! # SLURMBENCH BEGIN_ENV
//! module load unicycler
//! # SLURMBENCH MID_ENV
//! module unload unicycler
//! # SLURMBENCH END_ENV
//! ```
//!
//! Init is BEGIN..=MID, close is MID..=END. Lines outside are ignored.

use std::path::Path;

use crate::errors::{BenchError, Result};
use crate::fs::FileSystem;

pub const BEGIN_ENV_MARKER: &str = "# SLURMBENCH BEGIN_ENV";
pub const MID_ENV_MARKER: &str = "# SLURMBENCH MID_ENV";
pub const END_ENV_MARKER: &str = "# SLURMBENCH END_ENV";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvWrapper {
    lines: Vec<String>,
    begin: usize,
    mid: usize,
    end: usize,
}

impl EnvWrapper {
    pub fn read(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        if !fs.is_file(path) {
            return Err(BenchError::MissingEnvWrapper(path.to_path_buf()));
        }
        let text = fs.read_to_string(path)?;
        Self::parse(&text, path)
    }

    /// Index the markers in order; each is searched after the previous one.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let lines: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();
        let find = |from: usize, marker: &'static str| {
            lines
                .iter()
                .enumerate()
                .skip(from)
                .find(|(_, line)| line.starts_with(marker))
                .map(|(idx, _)| idx)
                .ok_or_else(|| BenchError::EnvWrapperMarker {
                    path: path.to_path_buf(),
                    marker,
                })
        };
        let begin = find(0, BEGIN_ENV_MARKER)?;
        let mid = find(begin + 1, MID_ENV_MARKER)?;
        let end = find(mid + 1, END_ENV_MARKER)?;
        Ok(Self {
            lines,
            begin,
            mid,
            end,
        })
    }

    pub fn init_env_lines(&self) -> &[String] {
        &self.lines[self.begin..=self.mid]
    }

    pub fn close_env_lines(&self) -> &[String] {
        &self.lines[self.mid..=self.end]
    }
}
