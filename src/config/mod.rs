// src/config/mod.rs

//! Settings loading and validation.
//!
//! - `model.rs`: the TOML-backed raw model.
//! - `loader.rs`: read a settings file from disk.
//! - `validate.rs`: raw model to [`Settings`], with semantic checks.
//! - `catalog.rs`: tool connectors built from the validated sections.

pub mod catalog;
pub mod loader;
pub mod model;
pub mod validate;

pub use catalog::Catalog;
pub use loader::{DEFAULT_SETTINGS_FILE, load_and_validate, load_from_path};
pub use model::{ArgumentSection, RawSettings, SchedulerSection, ToolSection, TopicSection};
pub use validate::{SchedulerSettings, parse_duration, validate_settings};

/// Validated settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub scheduler: SchedulerSettings,
    pub catalog: Catalog,
}
