// src/connector/tools.rs

//! Registry of the tools of one topic and the result kinds they produce.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{ToolDescription, TopicDescription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedTool {
    pub description: ToolDescription,
    /// Result kinds the tool's native output contains, e.g. `fasta_gz`.
    pub provides: BTreeSet<String>,
}

impl ProvidedTool {
    pub fn provides(&self, kind: &str) -> bool {
        self.provides.contains(kind)
    }
}

/// The enumerated set of legal tools for one topic, keyed by tool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSet {
    topic: TopicDescription,
    tools: BTreeMap<String, ProvidedTool>,
}

impl ToolSet {
    pub fn new(topic: TopicDescription) -> Self {
        Self {
            topic,
            tools: BTreeMap::new(),
        }
    }

    pub fn with_tool<I, S>(mut self, name: &str, cmd: &str, provides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(ToolDescription::new(name, cmd, self.topic.clone()), provides);
        self
    }

    pub fn insert<I, S>(&mut self, description: ToolDescription, provides: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tool = ProvidedTool {
            description,
            provides: provides.into_iter().map(Into::into).collect(),
        };
        self.tools.insert(tool.description.name().to_string(), tool);
    }

    pub fn topic(&self) -> &TopicDescription {
        &self.topic
    }

    pub fn get(&self, name: &str) -> Option<&ProvidedTool> {
        self.tools.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Tools able to produce `kind`.
    pub fn providers<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a ProvidedTool> + 'a {
        self.tools.values().filter(move |t| t.provides(kind))
    }
}
