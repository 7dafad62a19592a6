// src/types.rs

//! Identity values for topics and tools.
//!
//! A topic groups interchangeable tools (e.g. all assemblers). Both carry a
//! human name, used for directory names and job names, and a CLI slug.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicDescription {
    name: String,
    cmd: String,
}

impl TopicDescription {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl fmt::Display for TopicDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolDescription {
    name: String,
    cmd: String,
    topic: TopicDescription,
}

impl ToolDescription {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>, topic: TopicDescription) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            topic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    pub fn topic(&self) -> &TopicDescription {
        &self.topic
    }
}

impl fmt::Display for ToolDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic.name, self.name)
    }
}
