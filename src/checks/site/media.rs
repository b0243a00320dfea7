//! Media and asset checks: missing files, hosts, video sources, favicons.

use crate::{
    assets::compress::{ALLOWED_IMAGE_EXTENSIONS, ALLOWED_VIDEO_EXTENSIONS},
    html::{get_text, has_class, open_tag, select},
    utils::text::remove_code_and_math,
};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
    sync::LazyLock,
};

const MEDIA_TAGS: &str = "img, video, source, svg";
const EXTRA_MEDIA_EXTENSIONS: &[&str] = &[".svg", ".avif", ".ico"];

static MD_IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[.*?\]\((.*?)\)").unwrap());
static MD_MEDIA_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:img|video|svg|audio|source) [^>]*?src=["'](.*?)["']"#).unwrap()
});

fn media_src<'a>(tag: ElementRef<'a>) -> Option<&'a str> {
    let el = tag.value();
    let non_empty = |name| el.attr(name).filter(|s| !s.is_empty());
    non_empty("src").or_else(|| non_empty("href"))
}

fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

fn has_media_extension(src: &str) -> bool {
    let Some(ext) = Path::new(src).extension() else {
        return false;
    };
    let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
    ALLOWED_IMAGE_EXTENSIONS
        .iter()
        .chain(ALLOWED_VIDEO_EXTENSIONS)
        .chain(EXTRA_MEDIA_EXTENSIONS)
        .any(|allowed| *allowed == ext)
}

/// Collapse `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn resolve_media_path(src: &str, base_dir: &Path) -> PathBuf {
    if let Some(stripped) = src.strip_prefix('/') {
        return normalize_lexically(&base_dir.join(stripped.trim_start_matches('/')));
    }
    let direct = normalize_lexically(&base_dir.join(src));
    if direct.is_file() {
        direct
    } else {
        normalize_lexically(&base_dir.join(src.trim_start_matches(['.', '/'])))
    }
}

/// Local media references whose file does not exist under the site root.
pub fn missing_media_files(doc: &Html, base_dir: &Path) -> Vec<String> {
    select(doc, MEDIA_TAGS)
        .into_iter()
        .filter_map(media_src)
        .filter(|src| !is_remote(src) && has_media_extension(src))
        .filter_map(|src| {
            let path = resolve_media_path(src, base_dir);
            (!path.is_file()).then(|| format!("{src} (resolved to {})", path.display()))
        })
        .collect()
}

/// Missing local stylesheets and scripts.
///
/// Absolute hrefs resolve from the site root, relative ones from the page.
pub fn missing_assets(doc: &Html, file_path: &Path, base_dir: &Path) -> Vec<String> {
    let page_dir = file_path.parent().unwrap_or(base_dir);
    let mut refs = Vec::new();

    for link in select(doc, "link[href]") {
        let el = link.value();
        let rel: Vec<&str> = el.attr("rel").unwrap_or_default().split_whitespace().collect();
        let is_style = rel.contains(&"stylesheet")
            || (rel.contains(&"preload") && el.attr("as") == Some("style"));
        if is_style && let Some(href) = el.attr("href") {
            refs.push(href);
        }
    }
    refs.extend(select(doc, "script[src]").iter().filter_map(|s| s.value().attr("src")));

    refs.into_iter()
        .filter(|href| !(is_remote(href) || href.starts_with("//") || href.starts_with("data:")))
        .filter_map(|href| {
            let path = match href.strip_prefix('/') {
                Some(abs) => base_dir.join(abs),
                None => page_dir.join(href),
            };
            let path = normalize_lexically(&path);
            (!path.is_file()).then(|| format!("{href} (resolved to {})", path.display()))
        })
        .collect()
}

/// Remote media whose host is not one of `allowed_domains`.
pub fn invalid_media_asset_sources(doc: &Html, allowed_domains: &[String]) -> Vec<String> {
    select(doc, MEDIA_TAGS)
        .into_iter()
        .filter_map(|tag| Some((tag.value().name(), media_src(tag)?)))
        .filter(|(_, src)| !(src.starts_with('/') || src.starts_with('.')))
        .filter(|(_, src)| {
            let host = src.split('/').nth(2);
            !src.contains("//") || host.is_none_or(|h| !allowed_domains.iter().any(|d| d == h))
        })
        .map(|(tag, src)| format!("{src} (in {tag} tag)"))
        .collect()
}

// ============================================================================
// Video Sources
// ============================================================================

const EXPECTED_SOURCES: [(&str, &str); 2] =
    [("video/mp4; codecs=hvc1", ".mp4"), ("video/webm", ".webm")];

/// Source path without its extension, keeping any `?query`.
fn base_path(src: &str) -> String {
    let src = src.split('#').next().unwrap_or_default();
    let (path, query) = match src.split_once('?') {
        Some((path, query)) => (path, Some(query).filter(|q| !q.is_empty())),
        None => (src, None),
    };
    let stem = match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => &path[..dot],
        _ => path,
    };
    match query {
        Some(query) => format!("{stem}?{query}"),
        None => stem.to_owned(),
    }
}

/// Issues of the `index`-th (1-based) source; `Some(src)` when it is valid.
fn check_source(
    source: ElementRef<'_>,
    (expected_type, expected_ext): (&str, &str),
    index: usize,
    tag: &str,
) -> (Vec<String>, Option<String>) {
    let mut issues = Vec::new();
    let actual_type = source.value().attr("type");
    if actual_type.is_none_or(|t| !t.eq_ignore_ascii_case(expected_type)) {
        issues.push(format!(
            "Video source {index} type != '{expected_type}': {tag} (got '{}')",
            actual_type.unwrap_or("None")
        ));
    }

    let Some(src) = source.value().attr("src") else {
        issues.push(format!("Video source {index} 'src' missing or not a string: {tag}"));
        return (issues, None);
    };
    let path = src.split(['?', '#']).next().unwrap_or_default();
    if !path.to_ascii_lowercase().ends_with(expected_ext) {
        issues.push(format!(
            "Video source {index} 'src' does not end with {expected_ext}: '{src}' in {tag}"
        ));
    }

    let valid = issues.is_empty().then(|| src.to_owned());
    (issues, valid)
}

/// Every `<video>` carries an HEVC MP4 source then a WebM source of one asset.
pub fn video_source_order_and_match(doc: &Html) -> Vec<String> {
    let mut issues = Vec::new();

    for video in select(doc, "video") {
        if video.value().id() == Some("pond-video") {
            continue;
        }
        let tag = open_tag(video);
        let sources: Vec<ElementRef<'_>> = video
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| c.value().name() == "source")
            .collect();

        if sources.len() < EXPECTED_SOURCES.len() {
            issues.push(format!("<video> tag has < 2 <source> children: {tag}"));
            continue;
        }

        let mut valid = Vec::with_capacity(EXPECTED_SOURCES.len());
        for (i, (source, expected)) in sources.iter().zip(EXPECTED_SOURCES).enumerate() {
            let (source_issues, src) = check_source(*source, expected, i + 1, &tag);
            issues.extend(source_issues);
            valid.push(src);
        }

        // base paths are only comparable once both sources are well formed
        if let [Some(first), Some(second)] = valid.as_slice() {
            let (first, second) = (base_path(first), base_path(second));
            if first != second {
                issues.push(format!(
                    "Video source base paths mismatch: '{first}' vs '{second}' in {tag}"
                ));
            }
        }
    }

    issues
}

// ============================================================================
// Markdown Assets
// ============================================================================

/// Drop the staging prefix so markdown and HTML references compare equal.
///
/// Leading `../` or `./` is removed unless it leads into `asset_staging`,
/// then an `/asset_staging/` prefix is removed.
pub fn strip_path(path: &str) -> String {
    let mut rest = path.trim_start_matches(' ');

    for dots in ["..", "."] {
        if let Some(after) = rest.strip_prefix(dots) {
            if after.starts_with("/asset_staging") {
                rest = after;
                break;
            }
            if let Some(after_slash) = after.strip_prefix('/') {
                rest = after_slash;
                break;
            }
        }
    }

    rest.strip_prefix("/asset_staging/")
        .unwrap_or(rest)
        .trim_end_matches(' ')
        .to_owned()
}

/// Count occurrences while remembering first-seen order.
fn ordered_counts<I: IntoIterator<Item = String>>(items: I) -> Vec<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        match index.get(&item) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(item.clone(), order.len());
                order.push((item, 1));
            }
        }
    }
    order
}

/// Assets referenced more often in the source markdown than in the page.
pub fn missing_markdown_assets(doc: &Html, markdown: &str) -> Vec<String> {
    let markdown = remove_code_and_math(markdown, false);
    let md_assets = ordered_counts(
        MD_IMAGE
            .captures_iter(&markdown)
            .chain(MD_MEDIA_TAG.captures_iter(&markdown))
            .filter_map(|c| c.get(1).map(|m| strip_path(m.as_str()))),
    );

    let html_assets: HashMap<String, usize> = ordered_counts(
        select(doc, "img, video, svg, audio, source")
            .into_iter()
            .filter_map(|tag| tag.value().attr("src").map(strip_path)),
    )
    .into_iter()
    .collect();

    md_assets
        .into_iter()
        .filter_map(|(asset, md_count)| {
            let html_count = html_assets.get(&asset).copied().unwrap_or(0);
            (md_count > html_count).then(|| {
                format!(
                    "Asset {asset} appears {md_count} times in markdown but only {html_count} times in HTML"
                )
            })
        })
        .collect()
}

// ============================================================================
// Favicons
// ============================================================================

/// Favicons must sit directly inside a `span.favicon-span`.
pub fn invalid_favicon_parents(doc: &Html) -> Vec<String> {
    let mut issues = Vec::new();
    for favicon in select(doc, "img.favicon:not(.no-span)") {
        let parent = favicon.parent().and_then(ElementRef::wrap);
        if parent.is_some_and(|p| p.value().name() == "span" && has_class(p, "favicon-span")) {
            continue;
        }

        let src = favicon.value().attr("src").unwrap_or("unknown source");
        let mut message = format!("Favicon ({src}) is not a direct child of a span.favicon-span.");
        if let Some(parent) = parent {
            message.push_str(&format!(
                " Instead, it's a child of <{}>: {}",
                parent.value().name(),
                get_text(parent)
            ));
        }
        issues.push(message);
    }
    issues
}

/// The about page shows at least one favicon inside its prose.
pub fn missing_favicon(doc: &Html) -> bool {
    select(doc, "article p img.favicon").is_empty()
}

/// No preloaded EB Garamond subset in the head.
pub fn missing_preloaded_font(doc: &Html) -> bool {
    !select(doc, r#"link[rel~="preload"][as="font"]"#).iter().any(|link| {
        link.value()
            .attr("href")
            .is_some_and(|h| h.to_ascii_lowercase().contains("subfont/ebgaramond"))
    })
}
