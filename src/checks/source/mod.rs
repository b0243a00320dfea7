//! Markdown source validator.
//!
//! Unlike the site validator this runs sequentially: the post sequence
//! graph is shared between files through [`Rc`](std::rc::Rc) entries.

mod content;
mod fonts;
mod metadata;
mod sequence;

pub use sequence::{SequenceData, build_sequence_data};

use crate::{
    config::SiteConfig,
    log,
    probe::UrlProbe,
    report::{Issues, Report},
    utils::{files::get_files, frontmatter::split_yaml, git::git_root},
};
use anyhow::{Context, Result};
use serde_yaml::Mapping;
use std::{collections::HashMap, fs, path::Path};

/// Directories under the content root that hold no publishable posts.
const IGNORED_DIRS: &[&str] = &["templates", "drafts"];

/// Shared state threaded through the per-file checks.
pub struct SourceContext<'a> {
    pub sequence: &'a SequenceData,
    pub probe: &'a dyn UrlProbe,
    /// URL to the display path of the first file that claimed it
    pub existing_urls: HashMap<String, String>,
}

/// Run every source check on one file's frontmatter and full text.
///
/// Content checks see the whole file so reported line numbers match it.
pub fn check_file_data(
    mapping: &Mapping,
    text: &str,
    display_path: &str,
    ctx: &mut SourceContext<'_>,
) -> Result<Issues> {
    let mut issues = Issues::new();
    issues
        .list("required_fields", metadata::required_fields(mapping))
        .list("invalid_links", content::invalid_links(text))
        .list("latex_tags", content::latex_tags(text))
        .list("table_alignments", content::table_alignments(text))
        .list("unescaped_braces", content::unescaped_braces(text))
        .list("video_tags", content::video_tags(text))
        .list("forbidden_patterns", content::forbidden_patterns(text))
        .list(
            "duplicate_urls",
            metadata::duplicate_urls(mapping, display_path, &mut ctx.existing_urls),
        );

    if !mapping.is_empty() {
        issues.list(
            "post_slug_relationships",
            sequence::post_slug_relationships(mapping, ctx.sequence)?,
        );
    }
    issues.list("card_image", metadata::card_image(mapping, ctx.probe));
    Ok(issues)
}

fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}

/// Check every markdown source, then the font stylesheet.
pub fn run(config: &SiteConfig, probe: &dyn UrlProbe) -> Result<Report> {
    let content_dir = &config.paths.content;
    let files = get_files(content_dir, &[".md"], true, IGNORED_DIRS);
    log!("check"; "checking {} markdown files in {}", files.len(), content_dir.display());

    let sequence = build_sequence_data(&files)?;
    let base = git_root(content_dir).unwrap_or_else(|_| config.root.clone());
    let mut ctx = SourceContext {
        sequence: &sequence,
        probe,
        existing_urls: HashMap::new(),
    };

    let mut report = Report::new();
    for file in &files {
        let (mapping, _) = split_yaml(file)?;
        if mapping.is_empty() {
            continue;
        }
        let text = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let path = display_path(file, &base);
        let issues = check_file_data(&mapping, &text, &path, &mut ctx)?;
        report.add(path, issues);
    }

    let scss = &config.paths.fonts_scss;
    report.add(display_path(scss, &base), fonts::check_fonts(scss, &config.root));
    Ok(report)
}
