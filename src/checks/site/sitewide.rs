//! Checks on files that exist once per site.

use crate::report::Issues;
use rss::{Channel, validation::Validate};
use std::{fs, io::BufReader, path::Path};

/// `index.css` must exist and carry an `@supports` block for Firefox dropcaps.
pub fn css_issues(base_dir: &Path) -> Vec<String> {
    let css = base_dir.join("index.css");
    let Ok(content) = fs::read_to_string(&css) else {
        return vec![format!("CSS file {} does not exist", css.display())];
    };
    if content.contains("@supports") {
        Vec::new()
    } else {
        let name = css.file_name().unwrap_or_default().to_string_lossy();
        vec![format!(
            "CSS file {name} does not contain @supports, which is required for dropcaps in Firefox"
        )]
    }
}

pub fn robots_txt_issues(base_dir: &Path) -> Vec<String> {
    if base_dir.join("robots.txt").is_file() {
        Vec::new()
    } else {
        vec!["robots.txt not found in site root".to_owned()]
    }
}

/// `rss.xml` must parse and satisfy the RSS 2.0 rules.
pub fn rss_issues(base_dir: &Path) -> Vec<String> {
    let path = base_dir.join("rss.xml");
    let Ok(file) = fs::File::open(&path) else {
        return vec!["rss.xml not found in site root".to_owned()];
    };

    match Channel::read_from(BufReader::new(file)) {
        Ok(channel) => match channel.validate() {
            Ok(()) => Vec::new(),
            Err(err) => vec![format!("Invalid RSS feed: {err}")],
        },
        Err(err) => vec![format!("Failed to parse rss.xml: {err}")],
    }
}

/// Report of the site-level checks, in the order they run.
pub fn site_issues(base_dir: &Path, check_rss: bool) -> Issues {
    let mut issues = Issues::new();
    issues
        .list("CSS_issues", css_issues(base_dir))
        .list("robots_txt_issues", robots_txt_issues(base_dir));
    if check_rss {
        issues.list("rss_issues", rss_issues(base_dir));
    }
    issues
}
