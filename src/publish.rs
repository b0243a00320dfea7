//! Publish and update dates in post frontmatter.
//!
//! Only top-level posts in the content directory are stamped. A post gets
//! `date_published` the first time it is seen; `date_updated` follows every
//! local commit that touches it and has not reached `origin/main` yet.

use crate::{
    config::SiteConfig,
    exec, log,
    utils::{
        frontmatter::{scalar_to_string, set_fields, split_yaml},
        git::git_root,
    },
};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde_yaml::{Mapping, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PUBLISHED: &str = "date_published";
const UPDATED: &str = "date_updated";
const UPSTREAM_RANGE: &str = "origin/main..HEAD";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

// ============================================================================
// Dates
// ============================================================================

/// Parse an ISO 8601 date or timestamp; offsets are dropped.
pub fn parse_date(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }
    if let Some(dt) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Ok(dt);
    }
    if let Some(dt) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(dt);
    }
    bail!("Invalid date '{value}': expected an ISO 8601 date or timestamp")
}

fn date_value(at: NaiveDateTime) -> Value {
    Value::String(at.format(DATE_FORMAT).to_string())
}

fn date_str(mapping: &Mapping, key: &str) -> Option<String> {
    mapping
        .get(key)
        .and_then(scalar_to_string)
        .filter(|s| !s.trim().is_empty())
}

/// Stamp a never-published post, and give published posts an update date.
pub fn update_publish_date(mapping: &mut Mapping, now: NaiveDateTime) {
    let Some(published) = date_str(mapping, PUBLISHED) else {
        mapping.insert(PUBLISHED.into(), date_value(now));
        mapping.insert(UPDATED.into(), date_value(now));
        return;
    };
    if date_str(mapping, UPDATED).is_none() {
        mapping.insert(UPDATED.into(), Value::String(published));
    }
}

/// Rewrite both date fields as `YYYY-MM-DD HH:MM:SS`.
pub fn normalize_dates(mapping: &mut Mapping) -> Result<()> {
    for key in [PUBLISHED, UPDATED] {
        if let Some(raw) = date_str(mapping, key) {
            let at = parse_date(&raw).with_context(|| format!("in `{key}`"))?;
            mapping.insert(key.into(), date_value(at));
        }
    }
    Ok(())
}

// ============================================================================
// Git
// ============================================================================

/// Whether `relative` has commits that `origin/main` lacks.
///
/// A failing `git` counts as unmodified.
pub fn is_file_modified(repo: &Path, relative: &Path) -> bool {
    match exec!(repo; ["git"]; "diff", "--name-only", UPSTREAM_RANGE, "--", relative) {
        Ok(output) => !String::from_utf8_lossy(&output.stdout).trim().is_empty(),
        Err(err) => {
            log!("publish"; "could not diff {}: {err:#}", relative.display());
            false
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Apply every date rule to one post; returns whether it was rewritten.
pub fn update_file(path: &Path, now: NaiveDateTime, modified: bool) -> Result<bool> {
    let (mut mapping, body) = split_yaml(path)?;
    if mapping.is_empty() && body.trim().is_empty() {
        return Ok(false);
    }

    let original = mapping.clone();
    update_publish_date(&mut mapping, now);
    if modified {
        mapping.insert(UPDATED.into(), date_value(now));
    }
    normalize_dates(&mut mapping).with_context(|| format!("in {}", path.display()))?;

    let changed: Vec<(&str, String)> = [PUBLISHED, UPDATED]
        .into_iter()
        .filter(|key| mapping.get(*key) != original.get(*key))
        .filter_map(|key| Some((key, date_str(&mapping, key)?)))
        .collect();
    if changed.is_empty() {
        return Ok(false);
    }
    set_fields(path, &changed)?;
    log!("publish"; "Updated date information on {}", path.display());
    Ok(true)
}

fn top_level_posts(content: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(content)
        .with_context(|| format!("Failed to read directory {}", content.display()))?;
    let mut posts: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    posts.sort();
    Ok(posts)
}

/// Entry point for `update-dates`.
pub fn run(config: &SiteConfig) -> Result<()> {
    let content = &config.paths.content;
    let repo = git_root(content).unwrap_or_else(|_| config.root.clone());
    let now = Local::now().naive_local();

    let mut updated = 0;
    for post in top_level_posts(content)? {
        let relative = post.strip_prefix(&repo).unwrap_or(&post);
        let modified = is_file_modified(&repo, relative);
        if update_file(&post, now, modified)? {
            updated += 1;
        }
    }
    log!("publish"; "{updated} posts updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap()
    }

    fn yaml(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    fn get<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a str> {
        mapping.get(key).and_then(Value::as_str)
    }

    // ------------------------------------------------------------------------
    // Date rules
    // ------------------------------------------------------------------------

    #[test]
    fn test_unpublished_gets_both_dates() {
        for text in ["title: T\n", "title: T\ndate_published: \"\"\n"] {
            let mut mapping = yaml(text);
            update_publish_date(&mut mapping, now());
            assert_eq!(get(&mapping, PUBLISHED), Some("2024-05-06 07:08:09"));
            assert_eq!(get(&mapping, UPDATED), Some("2024-05-06 07:08:09"));
        }
    }

    #[test]
    fn test_published_copies_into_updated() {
        let mut mapping = yaml("date_published: 2023-01-02\n");
        update_publish_date(&mut mapping, now());
        assert_eq!(get(&mapping, UPDATED), Some("2023-01-02"));

        let mut mapping = yaml("date_published: 2023-01-02\ndate_updated: 2023-03-04\n");
        update_publish_date(&mut mapping, now());
        assert_eq!(get(&mapping, UPDATED), Some("2023-03-04"));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = "2023-01-02 03:04:05";
        for input in [
            "2023-01-02 03:04:05",
            "2023-01-02T03:04:05",
            "2023-01-02T03:04:05Z",
            "2023-01-02T03:04:05+02:00",
            "2023-01-02T03:04:05.250",
        ] {
            assert_eq!(parse_date(input).unwrap().format(DATE_FORMAT).to_string(), expected);
        }
        assert_eq!(
            parse_date("2023-01-02").unwrap().format(DATE_FORMAT).to_string(),
            "2023-01-02 00:00:00"
        );
        assert!(parse_date("January 2nd").is_err());
        assert!(parse_date("2023-13-40").is_err());
    }

    #[test]
    fn test_normalize_dates() {
        let mut mapping = yaml("date_published: 2023-01-02\ndate_updated: 2023-01-03T10:00:00Z\n");
        normalize_dates(&mut mapping).unwrap();
        assert_eq!(get(&mapping, PUBLISHED), Some("2023-01-02 00:00:00"));
        assert_eq!(get(&mapping, UPDATED), Some("2023-01-03 10:00:00"));

        let mut bad = yaml("date_published: last week\n");
        assert!(normalize_dates(&mut bad).is_err());
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    #[test]
    fn test_update_file_stamps_new_post() {
        let dir = TempDir::new().unwrap();
        let post = dir.path().join("post.md");
        fs::write(&post, "---\ntitle: T\n---\nBody\n").unwrap();

        assert!(update_file(&post, now(), false).unwrap());
        let (mapping, body) = split_yaml(&post).unwrap();
        assert_eq!(get(&mapping, "title"), Some("T"));
        assert_eq!(get(&mapping, PUBLISHED), Some("2024-05-06 07:08:09"));
        assert_eq!(get(&mapping, UPDATED), Some("2024-05-06 07:08:09"));
        assert_eq!(body, "\nBody\n");
    }

    #[test]
    fn test_update_file_unchanged_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let post = dir.path().join("post.md");
        let text = "---\ndate_published: 2023-01-02 00:00:00\ndate_updated: 2023-01-02 00:00:00\n---\nBody\n";
        fs::write(&post, text).unwrap();

        assert!(!update_file(&post, now(), false).unwrap());
        assert_eq!(fs::read_to_string(&post).unwrap(), text);
    }

    #[test]
    fn test_modified_post_gets_update_date() {
        let dir = TempDir::new().unwrap();
        let post = dir.path().join("post.md");
        fs::write(
            &post,
            "---\ndate_published: 2023-01-02 00:00:00\ndate_updated: 2023-01-02 00:00:00\n---\nBody\n",
        )
        .unwrap();

        assert!(update_file(&post, now(), true).unwrap());
        let (mapping, _) = split_yaml(&post).unwrap();
        assert_eq!(get(&mapping, PUBLISHED), Some("2023-01-02 00:00:00"));
        assert_eq!(get(&mapping, UPDATED), Some("2024-05-06 07:08:09"));
    }

    #[test]
    fn test_update_file_keeps_comments_and_quoting() {
        let dir = TempDir::new().unwrap();
        let post = dir.path().join("post.md");
        fs::write(
            &post,
            "---\n# series notes\ntitle: \"Quoted: title\"\ndate_published: 2023-01-02T03:04:05.250Z\n---\nBody\n",
        )
        .unwrap();

        assert!(update_file(&post, now(), false).unwrap());
        assert_eq!(
            fs::read_to_string(&post).unwrap(),
            "---\n# series notes\ntitle: \"Quoted: title\"\ndate_published: 2023-01-02 03:04:05\ndate_updated: 2023-01-02 03:04:05\n---\nBody\n"
        );
    }

    #[test]
    fn test_file_without_frontmatter_is_skipped() {
        let dir = TempDir::new().unwrap();
        let post = dir.path().join("notes.md");
        fs::write(&post, "plain text\n").unwrap();
        assert!(!update_file(&post, now(), true).unwrap());
        assert_eq!(fs::read_to_string(&post).unwrap(), "plain text\n");
    }

    #[test]
    fn test_top_level_posts_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("drafts")).unwrap();
        fs::write(dir.path().join("b.md"), "").unwrap();
        fs::write(dir.path().join("a.md"), "").unwrap();
        fs::write(dir.path().join("img.png"), "").unwrap();
        fs::write(dir.path().join("drafts/c.md"), "").unwrap();

        let posts = top_level_posts(dir.path()).unwrap();
        assert_eq!(posts, vec![dir.path().join("a.md"), dir.path().join("b.md")]);
    }

    #[test]
    fn test_outside_repository_counts_as_unmodified() {
        let dir = TempDir::new().unwrap();
        assert!(!is_file_modified(dir.path(), Path::new("post.md")));
    }
}
