//! Per-file issue reports.
//!
//! Each validator returns an [`Issues`]: check names in the order they ran,
//! each with a list of findings or a flag.
//!
//! ```text
//! Issues found in public/post.html:
//!   unprocessed_quotes:
//!     - Unprocessed quotes ['"']: He said "hi"
//!   missing_critical_css: true
//! ```

use serde::{Serialize, Serializer, ser::SerializeMap};
use std::fmt::Write;

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Finding {
    List(Vec<String>),
    Flag(bool),
}

impl Finding {
    pub fn is_issue(&self) -> bool {
        match self {
            Self::List(items) => !items.is_empty(),
            Self::Flag(flag) => *flag,
        }
    }
}

/// Insertion-ordered findings of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issues {
    entries: Vec<(String, Finding)>,
}

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&mut self, check: &str, items: Vec<String>) -> &mut Self {
        self.entries.push((check.to_owned(), Finding::List(items)));
        self
    }

    pub fn flag(&mut self, check: &str, flag: bool) -> &mut Self {
        self.entries.push((check.to_owned(), Finding::Flag(flag)));
        self
    }

    pub fn get(&self, check: &str) -> Option<&Finding> {
        self.entries
            .iter()
            .find(|(name, _)| name == check)
            .map(|(_, finding)| finding)
    }

    /// Findings of a list check, empty when absent.
    pub fn items(&self, check: &str) -> &[String] {
        match self.get(check) {
            Some(Finding::List(items)) => items,
            _ => &[],
        }
    }

    pub fn has_issues(&self) -> bool {
        self.entries.iter().any(|(_, finding)| finding.is_issue())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Text block for a file with issues; empty when nothing was found.
    pub fn render(&self, path: &str) -> String {
        if !self.has_issues() {
            return String::new();
        }

        let mut out = format!("Issues found in {path}:\n");
        for (check, finding) in &self.entries {
            match finding {
                Finding::List(items) if !items.is_empty() => {
                    let _ = writeln!(out, "  {check}:");
                    for item in items {
                        let _ = writeln!(out, "    - {item}");
                    }
                }
                Finding::Flag(true) => {
                    let _ = writeln!(out, "  {check}: true");
                }
                _ => {}
            }
        }
        out
    }
}

impl Serialize for Issues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (check, finding) in &self.entries {
            map.serialize_entry(check, finding)?;
        }
        map.end()
    }
}

/// Reports of a whole run, keyed by display path.
#[derive(Debug, Default)]
pub struct Report {
    files: Vec<(String, Issues)>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, issues: Issues) {
        self.files.push((path.into(), issues));
    }

    pub fn has_issues(&self) -> bool {
        self.files.iter().any(|(_, issues)| issues.has_issues())
    }

    /// Text blocks of every file with issues, separated by blank lines.
    pub fn render_text(&self) -> String {
        self.files
            .iter()
            .filter(|(_, issues)| issues.has_issues())
            .map(|(path, issues)| issues.render(path) + "\n")
            .collect()
    }

    /// Object of path to that file's findings, omitting clean files.
    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Print the report and return whether anything was found.
    pub fn print(&self, json: bool) -> anyhow::Result<bool> {
        if json {
            println!("{}", self.render_json()?);
        } else {
            print!("{}", self.render_text());
        }
        Ok(self.has_issues())
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let dirty: Vec<_> = self.files.iter().filter(|(_, i)| i.has_issues()).collect();
        let mut map = serializer.serialize_map(Some(dirty.len()))?;
        for (path, issues) in dirty {
            map.serialize_entry(path, issues)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Issues {
        let mut issues = Issues::new();
        issues
            .list("localhost_links", vec!["http://localhost:8080".into()])
            .list("duplicate_ids", Vec::new())
            .flag("empty_body", false)
            .flag("missing_critical_css", true);
        issues
    }

    #[test]
    fn test_has_issues() {
        assert!(sample().has_issues());

        let mut clean = Issues::new();
        clean.list("a", Vec::new()).flag("b", false);
        assert!(!clean.has_issues());
    }

    #[test]
    fn test_render_skips_clean_checks() {
        let text = sample().render("public/index.html");
        assert_eq!(
            text,
            "Issues found in public/index.html:\n  localhost_links:\n    - http://localhost:8080\n  missing_critical_css: true\n"
        );
    }

    #[test]
    fn test_render_clean_is_empty() {
        assert_eq!(Issues::new().render("x"), "");
    }

    #[test]
    fn test_json_keeps_insertion_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"localhost_links":["http://localhost:8080"],"duplicate_ids":[],"empty_body":false,"missing_critical_css":true}"#
        );
    }

    #[test]
    fn test_report_omits_clean_files() {
        let mut report = Report::new();
        report.add("a.html", Issues::new());
        report.add("b.html", sample());

        assert!(report.has_issues());
        let text = report.render_text();
        assert!(!text.contains("a.html"));
        assert!(text.starts_with("Issues found in b.html:"));

        let json: serde_json::Value = serde_json::from_str(&report.render_json().unwrap()).unwrap();
        assert!(json.get("a.html").is_none());
        assert_eq!(json["b.html"]["missing_critical_css"], true);
    }

    #[test]
    fn test_items_lookup() {
        let issues = sample();
        assert_eq!(issues.items("localhost_links"), ["http://localhost:8080"]);
        assert!(issues.items("nonexistent").is_empty());
    }
}
