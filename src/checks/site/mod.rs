//! Built-site validator.
//!
//! # Flow
//!
//! ```text
//! site checks ──► index.css, robots.txt, rss.xml
//! walk public/ ──► (page, markdown source) pairs ──► par_iter ──► Issues per page
//!                                                         │
//!                                                         └──► Report (path order)
//! ```

mod head;
mod links;
mod media;
mod sitewide;
mod text;

pub use head::DescriptionBounds;

use super::CheckError;
use crate::{
    config::SiteConfig,
    html::{body_is_empty, is_redirect, should_have_md},
    log,
    logger::ProgressBar,
    probe::UrlProbe,
    report::{Issues, Report},
    utils::{
        files::get_files,
        frontmatter::{get_str, get_str_list, split_yaml},
    },
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

// ============================================================================
// Per-page Checks
// ============================================================================

/// Run every page check on one HTML file.
///
/// Redirect pages yield an empty report. `md_path` is the markdown source
/// the page was built from, when known.
pub fn check_file_for_issues(
    file_path: &Path,
    base_dir: &Path,
    md_path: Option<&Path>,
    config: &SiteConfig,
    probe: &dyn UrlProbe,
) -> Result<Issues> {
    let content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    let doc = scraper::Html::parse_document(&content);

    let mut issues = Issues::new();
    if is_redirect(&doc) {
        return Ok(issues);
    }

    let bounds = DescriptionBounds {
        min: config.check.description_min,
        max: config.check.description_max,
    };

    issues
        .list("localhost_links", links::localhost_links(&doc))
        .list("invalid_internal_links", links::invalid_internal_links(&doc))
        .list("invalid_anchors", links::invalid_anchors(&doc, base_dir))
        .list("malformed_hrefs", links::malformed_hrefs(&doc))
        .list("problematic_paragraphs", text::problematic_paragraphs(&doc))
        .list("missing_media_files", media::missing_media_files(&doc, base_dir))
        .list("trailing_blockquotes", text::trailing_blockquotes(&doc))
        .list("missing_assets", media::missing_assets(&doc, file_path, base_dir))
        .list("problematic_katex", text::problematic_katex(&doc))
        .list("unrendered_subtitles", text::unrendered_subtitles(&doc))
        .list("unrendered_footnotes", text::unrendered_footnotes(&doc))
        .flag("missing_critical_css", head::missing_critical_css(&doc))
        .flag("empty_body", body_is_empty(&doc))
        .list("duplicate_ids", links::duplicate_ids(&doc))
        .list("unrendered_spoilers", text::unrendered_spoilers(&doc))
        .list("unrendered_emphasis", text::unrendered_emphasis(&doc))
        .list("katex_outside_blockquote", text::katex_outside_blockquote(&doc))
        .list("unprocessed_quotes", text::unprocessed_quotes(&doc))
        .list("unprocessed_dashes", text::unprocessed_dashes(&doc))
        .list("unrendered_html", text::unrendered_html(&doc))
        .list("emphasis_spacing", text::emphasis_spacing(&doc))
        .list("link_spacing", text::link_spacing(&doc))
        .list("long_description", head::long_description(&doc, bounds))
        .list(
            "late_header_tags",
            head::late_header_tags(&content, config.check.head_meta_bytes),
        )
        .list("problematic_iframes", head::problematic_iframes(&doc, probe))
        .list("consecutive_periods", text::consecutive_periods(&doc))
        .list("invalid_favicon_parents", media::invalid_favicon_parents(&doc))
        .list(
            "invalid_media_asset_sources",
            media::invalid_media_asset_sources(&doc, &config.site.asset_domains),
        )
        .list(
            "video_source_order_and_match",
            media::video_source_order_and_match(&doc),
        );

    if config.check.check_fonts {
        issues.flag("missing_preloaded_font", media::missing_preloaded_font(&doc));
    }

    if let Some(md_path) = md_path.filter(|p| p.is_file()) {
        let markdown = fs::read_to_string(md_path)
            .with_context(|| format!("Failed to read {}", md_path.display()))?;
        issues.list(
            "missing_markdown_assets",
            media::missing_markdown_assets(&doc, &markdown),
        );
    }

    if file_path.file_name().is_some_and(|n| n == "about.html") {
        issues.flag("missing_favicon", media::missing_favicon(&doc));
    }

    Ok(issues)
}

// ============================================================================
// Markdown Lookup
// ============================================================================

/// Map each permalink (slashes removed) to its markdown file.
///
/// Only top-level posts and drafts are considered.
pub fn build_html_to_md_map(content_dir: &Path) -> Result<HashMap<String, PathBuf>> {
    let mut map = HashMap::new();
    for dir in [content_dir.to_path_buf(), content_dir.join("drafts")] {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        files.sort();

        for md in files {
            let (mapping, _) = split_yaml(&md)?;
            if let Some(permalink) = get_str(&mapping, "permalink") {
                map.insert(permalink.replace('/', ""), md);
            }
        }
    }
    Ok(map)
}

/// Every alias declared in the sources, minus the post's own permalink.
pub fn collect_aliases(content_dir: &Path) -> Result<HashSet<String>> {
    let mut aliases = HashSet::new();
    for md in get_files(content_dir, &[".md"], true, &[]) {
        let (mapping, _) = split_yaml(&md)?;
        if !matches!(mapping.get("aliases"), Some(serde_yaml::Value::Sequence(_))) {
            continue;
        }
        let permalink = get_str(&mapping, "permalink").map(|p| p.trim_matches('/'));
        aliases.extend(
            get_str_list(&mapping, "aliases")
                .into_iter()
                .filter(|alias| Some(alias.trim_matches('/')) != permalink),
        );
    }
    Ok(aliases)
}

/// Pages to check, each with its markdown source when it has one.
fn collect_pages(config: &SiteConfig) -> Result<Vec<(PathBuf, Option<PathBuf>)>> {
    let base_dir = &config.paths.public;
    let md_map = build_html_to_md_map(&config.paths.content)?;
    let aliases = collect_aliases(&config.paths.content)?;

    let mut pages = Vec::new();
    let walker = WalkDir::new(base_dir).sort_by_file_name().into_iter();
    for entry in walker.filter_entry(|e| {
        let rel = e.path().strip_prefix(base_dir).unwrap_or(e.path());
        !(e.file_type().is_dir() && rel.to_string_lossy().contains("drafts"))
    }) {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "html") {
            continue;
        }

        let stem = path.file_stem().unwrap_or_default().to_string_lossy().into_owned();
        if aliases.contains(&stem) {
            continue;
        }

        let mut md_path = None;
        if path.parent() == Some(base_dir.as_path()) {
            md_path = md_map
                .get(&stem)
                .or_else(|| md_map.get(&stem.to_lowercase()))
                .cloned();
            if md_path.is_none() && should_have_md(path, &config.site.slugs_without_md)? {
                return Err(CheckError::MissingMarkdown(stem).into());
            }
        }
        pages.push((path.to_path_buf(), md_path));
    }

    Ok(pages)
}

// ============================================================================
// Driver
// ============================================================================

/// Check the whole built site.
pub fn run(config: &SiteConfig, probe: &dyn UrlProbe) -> Result<Report> {
    let base_dir = &config.paths.public;
    let mut report = Report::new();
    report.add(display_path(base_dir, config), sitewide::site_issues(base_dir, config.check.rss));

    let pages = collect_pages(config)?;
    log!("check"; "checking {} pages in {}", pages.len(), base_dir.display());

    let progress = ProgressBar::new("html", pages.len());
    let results: Vec<Result<Issues>> = pages
        .par_iter()
        .map(|(page, md_path)| {
            let issues = check_file_for_issues(page, base_dir, md_path.as_deref(), config, probe);
            progress.inc();
            issues
        })
        .collect();
    progress.finish();

    for ((page, _), issues) in pages.iter().zip(results) {
        report.add(display_path(page, config), issues?);
    }
    Ok(report)
}

fn display_path(path: &Path, config: &SiteConfig) -> String {
    path.strip_prefix(&config.root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::fake::FakeProbe;
    use tempfile::TempDir;

    const CLEAN_PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<meta name="description" content="A page that passes every check.">
<style id="critical-css">body{}</style>
</head><body><article><p>Hello there, world.</p></article></body></html>"#;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn site() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "public/index.css", "@supports (x: y) {}");
        write(root, "public/robots.txt", "User-agent: *");

        let mut config = SiteConfig::default();
        config.root = root.to_path_buf();
        config.paths.public = root.join("public");
        config.paths.content = root.join("content");
        config.check.rss = false;
        (dir, config)
    }

    #[test]
    fn test_clean_page_has_no_issues() {
        let (dir, config) = site();
        let page = write(dir.path(), "public/post.html", CLEAN_PAGE);
        let issues =
            check_file_for_issues(&page, &config.paths.public, None, &config, &FakeProbe::default())
                .unwrap();
        assert!(!issues.has_issues(), "{}", issues.render("post.html"));
        assert!(issues.get("missing_preloaded_font").is_none());
        assert!(issues.get("missing_favicon").is_none());
    }

    #[test]
    fn test_redirect_page_is_empty() {
        let (dir, config) = site();
        let page = write(
            dir.path(),
            "public/old.html",
            r#"<html><head><meta http-equiv="refresh" content="0; url=/new"></head><body></body></html>"#,
        );
        let issues =
            check_file_for_issues(&page, &config.paths.public, None, &config, &FakeProbe::default())
                .unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn test_optional_checks() {
        let (dir, mut config) = site();
        config.check.check_fonts = true;
        let page = write(dir.path(), "public/about.html", CLEAN_PAGE);
        let md = write(dir.path(), "content/about.md", "---\npermalink: about\n---\n![x](static/x.avif)\n");

        let issues = check_file_for_issues(
            &page,
            &config.paths.public,
            Some(&md),
            &config,
            &FakeProbe::default(),
        )
        .unwrap();
        assert_eq!(issues.get("missing_preloaded_font"), Some(&crate::report::Finding::Flag(true)));
        assert_eq!(issues.get("missing_favicon"), Some(&crate::report::Finding::Flag(true)));
        assert_eq!(issues.items("missing_markdown_assets").len(), 1);
    }

    #[test]
    fn test_build_html_to_md_map() {
        let (dir, config) = site();
        let post = write(dir.path(), "content/post.md", "---\npermalink: /my-post/\n---\nbody");
        let draft = write(dir.path(), "content/drafts/wip.md", "---\npermalink: wip\n---\n");
        write(dir.path(), "content/nested/deep.md", "---\npermalink: deep\n---\n");

        let map = build_html_to_md_map(&config.paths.content).unwrap();
        assert_eq!(map.get("my-post"), Some(&post));
        assert_eq!(map.get("wip"), Some(&draft));
        assert!(!map.contains_key("deep"));
    }

    #[test]
    fn test_collect_aliases() {
        let (dir, config) = site();
        write(
            dir.path(),
            "content/post.md",
            "---\npermalink: post\naliases:\n  - old-post\n  - post\n---\n",
        );
        write(dir.path(), "content/other.md", "---\naliases: single\n---\n");

        let aliases = collect_aliases(&config.paths.content).unwrap();
        assert_eq!(aliases, HashSet::from(["old-post".to_string()]));
    }

    #[test]
    fn test_run_reports_in_path_order() {
        let (dir, config) = site();
        write(dir.path(), "content/a.md", "---\npermalink: a\n---\n");
        write(dir.path(), "content/b.md", "---\npermalink: b\naliases: [b-old]\n---\n");
        write(dir.path(), "public/a.html", CLEAN_PAGE);
        write(dir.path(), "public/b.html", "<html><body><p>x--y</p></body></html>");
        write(dir.path(), "public/b-old.html", "<html><body><p>x--y</p></body></html>");
        write(dir.path(), "public/drafts/wip.html", "<p>ignored</p>");
        write(dir.path(), "public/tags/ai.html", "<html><body><p>fine</p></body></html>");

        let report = run(&config, &FakeProbe::default()).unwrap();
        let text = report.render_text();
        assert!(text.contains("Issues found in public/b.html:"));
        assert!(!text.contains("a.html"));
        assert!(!text.contains("b-old.html"));
        assert!(!text.contains("wip.html"));
        assert!(report.has_issues());
    }

    #[test]
    fn test_run_requires_markdown_for_posts() {
        let (dir, config) = site();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        write(dir.path(), "public/orphan.html", CLEAN_PAGE);

        let err = run(&config, &FakeProbe::default()).unwrap_err();
        assert_eq!(err.to_string(), "Markdown file for orphan not found");
    }
}
