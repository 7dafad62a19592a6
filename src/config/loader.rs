// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::config::Settings;
use crate::config::model::RawSettings;
use crate::errors::Result;

/// Load a settings file and return the raw `RawSettings`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] to get
/// a checked [`Settings`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading settings file {:?}", path))?;

    let settings: RawSettings = toml::from_str(&contents)?;

    Ok(settings)
}

/// Load a settings file and validate topics, tools, arguments and the
/// scheduler section.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let raw = load_from_path(&path)?;
    let settings = Settings::try_from(raw)?;
    Ok(settings)
}

/// Settings file read when `--settings` is not given, relative to the
/// current working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "slurmbench.toml";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BenchError;

    #[test]
    fn loads_a_settings_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_SETTINGS_FILE);
        fs::write(
            &path,
            "[scheduler]\npoll_interval = \"5s\"\n\n[topic.assembly]\n\n[tool.skesa]\ntopic = \"assembly\"\nprovides = [\"fasta_gz\"]\ncommand = \"skesa\"\n",
        )
        .unwrap();

        let settings = load_and_validate(&path).unwrap();
        assert_eq!(settings.scheduler.poll.interval.as_secs(), 5);
        assert!(settings.catalog.get("skesa").is_ok());
    }

    #[test]
    fn unknown_keys_are_toml_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("slurmbench.toml");
        fs::write(&path, "[schedulr]\n").unwrap();
        assert!(matches!(load_and_validate(&path), Err(BenchError::TomlError(_))));
    }
}
