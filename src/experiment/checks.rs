// src/experiment/checks.rs

//! Pre-run guards and sample selection.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, error};

use crate::connector::ToolResult;
use crate::errors::{BenchError, Result};
use crate::experiment::config::ExperimentConfig;
use crate::experiment::layout::ExperimentLayout;
use crate::fs::FileSystem;
use crate::samples::{Manifest, MissingInput, RowNumberedSample, SampleStatus, status};

pub const ACCESS_TEST_FILE: &str = "test_read_write.txt";

/// Write, read back and delete a probe file in `root`.
///
/// With `create`, a missing `root` is created first and removed again if
/// the probe leaves it empty.
pub fn check_access(root: &Path, create: bool) -> Result<()> {
    let access = |reason: String| {
        error!(root = ?root, %reason, "access check failed");
        BenchError::Access {
            root: root.to_path_buf(),
            reason,
        }
    };

    if create {
        fs::create_dir_all(root).map_err(|e| access(format!("cannot create directory: {e}")))?;
    } else if !root.is_dir() {
        return Err(access("directory does not exist".to_string()));
    }

    let probe = root.join(ACCESS_TEST_FILE);
    let outcome = fs::write(&probe, "test")
        .map_err(|e| access(format!("no write access: {e}")))
        .and_then(|()| {
            fs::read_to_string(&probe)
                .map(|_| ())
                .map_err(|e| access(format!("no read access: {e}")))
        });
    let _ = fs::remove_file(&probe);
    if create {
        remove_if_empty(root);
    }
    outcome
}

fn remove_if_empty(dir: &Path) {
    let empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if empty {
        let _ = fs::remove_dir(dir);
    }
}

/// Compare `config` with the one stored on the data side, if any.
///
/// Returns whether a stored config exists. A stored config that does not
/// parse is a syntax error; one that differs is a conflict.
pub fn ensure_same_experiment(
    fs: &dyn FileSystem,
    data: &ExperimentLayout,
    config: &ExperimentConfig,
) -> Result<bool> {
    let stored_path = data.config_yaml();
    if !fs.is_file(&stored_path) {
        return Ok(false);
    }
    let stored = ExperimentConfig::read(fs, &stored_path)?;
    if !config.is_same_experiment(&stored)? {
        error!(experiment = %config.name, path = ?stored_path, "stored config differs");
        return Err(BenchError::DifferentExperiment {
            name: config.name.clone(),
            path: stored_path,
        });
    }
    debug!(experiment = %config.name, "resuming existing experiment");
    Ok(true)
}

/// Samples of `manifest` whose data-side status is not OK.
pub fn samples_to_run(fs: &dyn FileSystem, data: &ExperimentLayout, manifest: &Manifest) -> Vec<RowNumberedSample> {
    manifest
        .samples
        .iter()
        .filter(|s| !status(fs, &data.sample_dir(s.sample())).is_ok())
        .cloned()
        .collect()
}

/// A sample held back because some inputs are not usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedSample {
    pub sample: RowNumberedSample,
    /// One row per failing argument.
    pub missing: Vec<MissingInput>,
}

/// Split `samples` into runnable ones and those with unusable inputs.
pub fn partition_by_inputs(
    fs: &dyn FileSystem,
    samples: Vec<RowNumberedSample>,
    inputs: &BTreeMap<String, ToolResult>,
) -> (Vec<RowNumberedSample>, Vec<BlockedSample>) {
    let mut runnable = Vec::new();
    let mut blocked = Vec::new();
    for sample in samples {
        let missing: Vec<MissingInput> = inputs
            .iter()
            .filter_map(|(arg, result)| {
                let upstream = result.check(fs, sample.sample());
                (!upstream.is_ok()).then(|| result.missing_input(arg, upstream))
            })
            .collect();
        if missing.is_empty() {
            runnable.push(sample);
        } else {
            debug!(sample = %sample.sample(), missing = missing.len(), "inputs not ready");
            blocked.push(BlockedSample { sample, missing });
        }
    }
    (runnable, blocked)
}

/// Data-side status of every manifest sample, grouped by status.
pub fn status_summary(
    fs: &dyn FileSystem,
    data: &ExperimentLayout,
    manifest: &Manifest,
) -> BTreeMap<SampleStatus, Vec<RowNumberedSample>> {
    let mut summary: BTreeMap<SampleStatus, Vec<RowNumberedSample>> = BTreeMap::new();
    for sample in &manifest.samples {
        summary
            .entry(status(fs, &data.sample_dir(sample.sample())))
            .or_default()
            .push(sample.clone());
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ToolResult;
    use crate::experiment::config::Argument;
    use crate::fs::mock::MockFileSystem;
    use crate::samples::{ManifestColumns, Sample};
    use crate::types::{ToolDescription, TopicDescription};
    use std::path::PathBuf;

    fn data() -> ExperimentLayout {
        let tool = ToolDescription::new("plasbin", "plasbin", TopicDescription::new("plasmidness", "plm"));
        ExperimentLayout::data("/d", tool, "e")
    }

    fn upstream() -> ToolResult {
        let tool = ToolDescription::new("skesa", "skesa", TopicDescription::new("assembly", "asm"));
        ToolResult::Original {
            kind: "fasta_gz".into(),
            layout: ExperimentLayout::data("/d", tool, "a"),
        }
    }

    fn manifest() -> Manifest {
        Manifest {
            path: PathBuf::from("/d/samples.tsv"),
            columns: ManifestColumns::default(),
            samples: vec![
                RowNumberedSample::new(2, Sample::new("sp", "a")),
                RowNumberedSample::new(3, Sample::new("sp", "b")),
                RowNumberedSample::new(4, Sample::new("sp", "c")),
            ],
        }
    }

    #[test]
    fn ok_samples_are_skipped() {
        let fs = MockFileSystem::new()
            .with_file("/d/plasmidness/plasbin/e/sp_a/done.log", "")
            .with_file("/d/plasmidness/plasbin/e/sp_b/errors.log", "");
        let to_run = samples_to_run(&fs, &data(), &manifest());
        let ids: Vec<usize> = to_run.iter().map(|s| s.line_number()).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn missing_upstream_blocks_the_sample() {
        let fs = MockFileSystem::new()
            .with_file("/d/assembly/skesa/a/sp_a/done.log", "")
            .with_file("/d/assembly/skesa/a/sp_b/errors.log", "");
        let inputs = BTreeMap::from([("fasta".to_string(), upstream())]);

        let (runnable, blocked) = partition_by_inputs(&fs, manifest().samples, &inputs);

        assert_eq!(runnable.len(), 1);
        assert_eq!(runnable[0].sample(), &Sample::new("sp", "a"));
        assert_eq!(blocked.len(), 2);
        assert_eq!(blocked[0].missing.len(), 1);
        assert_eq!(blocked[0].missing[0].reason, SampleStatus::Error);
        assert_eq!(blocked[1].missing[0].reason, SampleStatus::NotRun);
    }

    #[test]
    fn stored_config_must_match() {
        let mut stored = ExperimentConfig::new("e");
        stored.tool.arguments.insert("fasta".into(), Argument::new("skesa", "a"));
        let fs = MockFileSystem::new().with_file(
            "/d/plasmidness/plasbin/e/config.yaml",
            stored.to_yaml().unwrap(),
        );

        assert!(ensure_same_experiment(&fs, &data(), &stored).unwrap());

        let mut other = stored.clone();
        other.tool.arguments.insert("fasta".into(), Argument::new("skesa", "b"));
        assert!(matches!(
            ensure_same_experiment(&fs, &data(), &other),
            Err(BenchError::DifferentExperiment { .. })
        ));
    }

    #[test]
    fn unparsable_stored_config_is_a_syntax_error() {
        let fs = MockFileSystem::new().with_file("/d/plasmidness/plasbin/e/config.yaml", "name: [");
        assert!(matches!(
            ensure_same_experiment(&fs, &data(), &ExperimentConfig::new("e")),
            Err(BenchError::ConfigSyntax { .. })
        ));
    }

    #[test]
    fn access_probe_leaves_no_trace() {
        let tmp = tempfile::tempdir().unwrap();
        check_access(tmp.path(), false).unwrap();
        assert!(!tmp.path().join(ACCESS_TEST_FILE).exists());

        let work = tmp.path().join("new_work");
        check_access(&work, true).unwrap();
        assert!(!work.exists());

        assert!(matches!(
            check_access(&tmp.path().join("absent"), false),
            Err(BenchError::Access { .. })
        ));
    }

    #[test]
    fn summary_groups_by_status() {
        let fs = MockFileSystem::new().with_file("/d/plasmidness/plasbin/e/sp_a/done.log", "");
        let summary = status_summary(&fs, &data(), &manifest());
        assert_eq!(summary[&SampleStatus::Ok].len(), 1);
        assert_eq!(summary[&SampleStatus::NotRun].len(), 2);
    }
}
