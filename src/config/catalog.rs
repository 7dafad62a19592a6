// src/config/catalog.rs

//! Tool registry built from the `[topic.*]` and `[tool.*]` sections.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::model::RawSettings;
use crate::connector::{ArgumentPath, Connector, Requirement, ShellSnippet, ToolSet};
use crate::errors::{BenchError, Result};
use crate::types::{ToolDescription, TopicDescription};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Keyed by tool cmd.
    connectors: BTreeMap<String, Connector>,
}

impl Catalog {
    /// Assumes `raw` passed [`super::validate::validate_settings`].
    pub(crate) fn from_raw(raw: &RawSettings) -> Self {
        let topics: BTreeMap<&str, TopicDescription> = raw
            .topic
            .iter()
            .map(|(name, section)| {
                let cmd = section.cmd.as_deref().unwrap_or(name);
                (name.as_str(), TopicDescription::new(name.as_str(), cmd))
            })
            .collect();

        let mut tool_sets: BTreeMap<&str, ToolSet> = topics
            .iter()
            .map(|(name, topic)| (*name, ToolSet::new(topic.clone())))
            .collect();
        let mut descriptions = BTreeMap::new();
        for (name, tool) in &raw.tool {
            let Some(topic) = topics.get(tool.topic.as_str()) else {
                continue;
            };
            let cmd = tool.cmd.as_deref().unwrap_or(name);
            let description = ToolDescription::new(name.as_str(), cmd, topic.clone());
            if let Some(set) = tool_sets.get_mut(tool.topic.as_str()) {
                set.insert(description.clone(), tool.provides.iter().cloned());
            }
            descriptions.insert(name.as_str(), description);
        }

        let mut catalog = Catalog::default();
        for (name, tool) in &raw.tool {
            let Some(description) = descriptions.get(name.as_str()) else {
                continue;
            };
            let mut connector = Connector::new(
                description.clone(),
                Arc::new(ShellSnippet(tool.command.clone())),
            );
            for (arg, section) in &tool.arguments {
                let Some(set) = tool_sets.get(section.topic.as_str()) else {
                    continue;
                };
                let requirement = match &section.formatted {
                    None => Requirement::Original {
                        kind: section.result.clone(),
                    },
                    Some(file) => Requirement::Formatted {
                        kind: section.result.clone(),
                        file: file.clone(),
                    },
                };
                connector = connector.with_argument(ArgumentPath::new(arg.as_str(), set.clone(), requirement));
            }
            catalog.insert(connector);
        }
        catalog
    }

    pub fn insert(&mut self, connector: Connector) {
        self.connectors
            .insert(connector.description().cmd().to_string(), connector);
    }

    /// Look a tool up by cmd, then by name.
    pub fn get(&self, tool: &str) -> Result<&Connector> {
        self.connectors
            .get(tool)
            .or_else(|| {
                self.connectors
                    .values()
                    .find(|c| c.description().name() == tool)
            })
            .ok_or_else(|| BenchError::ToolNotFound(tool.to_string()))
    }

    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.values()
    }
}
