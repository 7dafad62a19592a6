#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

use slurmbench::experiment::RunLayouts;
use slurmbench::types::ToolDescription;

pub use slurmbench_test_utils::builders;
pub use slurmbench_test_utils::init_tracing;

/// A temporary data root (created) and work root (not created).
pub struct Sandbox {
    _tmp: TempDir,
    pub data_root: PathBuf,
    pub work_root: PathBuf,
    pub configs: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let data_root = tmp.path().join("data");
        let configs = tmp.path().join("configs");
        std::fs::create_dir_all(&data_root).unwrap();
        std::fs::create_dir_all(&configs).unwrap();
        Self {
            data_root,
            work_root: tmp.path().join("work"),
            configs,
            _tmp: tmp,
        }
    }

    /// Layouts of `experiment`; only the data and work sides matter here.
    pub fn layouts(&self, tool: ToolDescription, experiment: &str) -> RunLayouts {
        RunLayouts::new(&self.data_root, &self.work_root, tool, experiment)
    }
}
