//! YAML frontmatter of markdown posts.
//!
//! The file text is split on the first two `---` markers: the text between
//! them is the YAML document and everything after the second marker is the
//! body.

use crate::log;
use anyhow::{Context, Result, bail};
use serde_yaml::{Mapping, Value};
use std::{fs, path::Path};

/// Split a markdown file into its frontmatter mapping and body.
///
/// Files without two `---` markers, or whose YAML does not parse into a
/// mapping, yield an empty mapping and an empty body.
pub fn split_yaml(path: &Path) -> Result<(Mapping, String)> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(split_yaml_str(&content, path))
}

pub fn split_yaml_str(content: &str, path: &Path) -> (Mapping, String) {
    let mut parts = content.splitn(3, "---");
    let (Some(_), Some(yaml), Some(body)) = (parts.next(), parts.next(), parts.next()) else {
        return (Mapping::new(), String::new());
    };

    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(mapping)) => (mapping, body.to_owned()),
        Ok(Value::Null) => (Mapping::new(), body.to_owned()),
        Ok(_) => {
            log!("source"; "frontmatter of {} is not a mapping", path.display());
            (Mapping::new(), String::new())
        }
        Err(err) => {
            log!("error"; "parsing YAML in {}: {err}", path.display());
            (Mapping::new(), String::new())
        }
    }
}

/// Set top-level scalar `fields` in the frontmatter of `path`.
///
/// Every other line is written back untouched, comments and quoting
/// included.
pub fn set_fields(path: &Path, fields: &[(&str, String)]) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let Some(updated) = set_fields_str(&content, fields) else {
        bail!("No frontmatter in {}", path.display());
    };
    fs::write(path, updated).with_context(|| format!("Failed to write {}", path.display()))
}

/// A present key has its line replaced; a missing one is appended.
pub fn set_fields_str(content: &str, fields: &[(&str, String)]) -> Option<String> {
    let mut parts = content.splitn(3, "---");
    let (Some(head), Some(yaml), Some(body)) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };

    let mut lines: Vec<String> = yaml.lines().map(str::to_owned).collect();
    for (key, value) in fields {
        let prefix = format!("{key}:");
        let entry = format!("{key}: {value}");
        match lines.iter_mut().find(|line| line.starts_with(&prefix)) {
            Some(line) => *line = entry,
            None => lines.push(entry),
        }
    }
    let yaml = lines.join("\n");
    Some(format!("{head}---{yaml}\n---{body}"))
}

/// String value of `key`, if present and a string.
pub fn get_str<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a str> {
    mapping.get(key).and_then(Value::as_str)
}

/// A string is a one-element list and a sequence yields its scalar elements.
pub fn get_str_list(mapping: &Mapping, key: &str) -> Vec<String> {
    match mapping.get(key) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_to_string).collect(),
        _ => Vec::new(),
    }
}

/// Display form of a scalar YAML value.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `null`, `""`, `[]` and `{}` count as empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Sequence(s) => s.is_empty(),
        Value::Mapping(m) => m.is_empty(),
        _ => false,
    }
}
