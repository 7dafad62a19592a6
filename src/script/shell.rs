// src/script/shell.rs

//! Small bash rendering helpers.

use std::path::Path;

pub const SHEBANG: &str = "#!/usr/bin/env bash";

/// Single-quote `s` for bash.
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

pub fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Environment variable name for an argument: `graph-gz` -> `GRAPH_GZ`.
pub fn var_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// `NAME=('a' 'b')`
pub fn array(name: &str, items: &[String]) -> String {
    let items: Vec<String> = items.iter().map(|i| quote(i)).collect();
    format!("{name}=({})", items.join(" "))
}
