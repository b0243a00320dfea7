//! HTML parsing helpers for the built-site checks.
//!
//! Text nodes are handed around as `(parent, text)` pairs: every skip rule
//! is decided by the parent element and its ancestors.

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::{fs, path::Path};

/// Tags whose text is never prose.
const SKIP_TAGS: &[&str] = &["code", "pre", "script", "style"];
/// Classes the typography pass leaves untouched.
const SKIP_CLASSES: &[&str] = &["no-formatting", "elvish", "bad-handwriting"];
/// Classes whose text is rendered math.
const KATEX_CLASSES: &[&str] = &["katex", "katex-display"];

// ============================================================================
// Parsing
// ============================================================================

pub fn parse_html_file(path: &Path) -> Result<Html> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Html::parse_document(&content))
}

/// All elements matching `css`; an invalid selector matches nothing.
pub fn select<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|sel| doc.select(&sel).collect())
        .unwrap_or_default()
}

// ============================================================================
// Page Classification
// ============================================================================

/// A `<meta http-equiv="refresh" content="0; url=...">` page.
pub fn is_redirect(doc: &Html) -> bool {
    select(doc, "meta").iter().any(|meta| {
        let el = meta.value();
        el.attr("http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
            && el
                .attr("content")
                .is_some_and(|c| c.to_ascii_lowercase().contains("url="))
    })
}

/// No `<body>`, or a `<body>` without element children.
pub fn body_is_empty(doc: &Html) -> bool {
    select(doc, "body")
        .first()
        .is_none_or(|body| body.children().all(|c| ElementRef::wrap(c).is_none()))
}

/// Whether a generated page is expected to come from a markdown file.
pub fn should_have_md(path: &Path, slugs_without_md: &[String]) -> Result<bool> {
    if path.components().any(|c| c.as_os_str() == "tags") {
        return Ok(false);
    }
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    if slugs_without_md.iter().any(|s| *s == stem) {
        return Ok(false);
    }
    Ok(!is_redirect(&parse_html_file(path)?))
}

// ============================================================================
// Element Helpers
// ============================================================================

pub fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// True if `element` or an ancestor is code-like or opted out of formatting.
pub fn should_skip(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| {
            SKIP_TAGS.contains(&el.value().name())
                || SKIP_CLASSES.iter().any(|class| has_class(el, class))
        })
}

/// Text of `element` without code, scripts, styles or KaTeX output.
pub fn non_code_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_non_code_text(element, &mut out);
    out
}

fn push_non_code_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(el) = ElementRef::wrap(child) {
            let excluded = SKIP_TAGS.contains(&el.value().name())
                || KATEX_CLASSES.iter().any(|class| has_class(el, class));
            if !excluded {
                push_non_code_text(el, out);
            }
        }
    }
}

/// Every text node of the document with its parent element.
pub fn text_nodes(doc: &Html) -> Vec<(ElementRef<'_>, &str)> {
    doc.root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(ElementRef::wrap)?;
            Some((parent, &**text))
        })
        .collect()
}

/// Full text content, like `textContent`.
pub fn get_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Trimmed, non-empty text fragments below `element`.
pub fn stripped_strings(element: ElementRef<'_>) -> Vec<&str> {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Opening tag as written, e.g. `<video id="x">`.
pub fn open_tag(element: ElementRef<'_>) -> String {
    let html = element.html();
    match html.split_once('>') {
        Some((open, _)) => format!("{open}>"),
        None => html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        select(doc, css)[0]
    }

    #[test]
    fn test_is_redirect() {
        let doc = Html::parse_document(
            r#"<html><head><meta http-equiv="Refresh" content="0; URL=/new"></head></html>"#,
        );
        assert!(is_redirect(&doc));

        let doc = Html::parse_document(r#"<html><head><meta name="description" content="url=x"></head></html>"#);
        assert!(!is_redirect(&doc));
    }

    #[test]
    fn test_body_is_empty() {
        assert!(body_is_empty(&Html::parse_document("<html><body>   </body></html>")));
        assert!(body_is_empty(&Html::parse_document("<html><body>text only</body></html>")));
        assert!(!body_is_empty(&Html::parse_document("<html><body><p>x</p></body></html>")));
    }

    #[test]
    fn test_should_skip() {
        let doc = Html::parse_document(
            r#"<p><code><span id="a">x</span></code><span class="no-formatting"><b id="b">y</b></span><i id="c">z</i></p>"#,
        );
        assert!(should_skip(first(&doc, "#a")));
        assert!(should_skip(first(&doc, "#b")));
        assert!(!should_skip(first(&doc, "#c")));
    }

    #[test]
    fn test_non_code_text() {
        let doc = Html::parse_document(
            r#"<p>Hello <code>x*y</code>world <span class="katex">a_b</span>!</p>"#,
        );
        assert_eq!(non_code_text(first(&doc, "p")), "Hello world !");
    }

    #[test]
    fn test_text_nodes_parents() {
        let doc = Html::parse_document("<p>one <em>two</em></p>");
        let nodes: Vec<(&str, &str)> = text_nodes(&doc)
            .into_iter()
            .map(|(parent, text)| (parent.value().name(), text))
            .collect();
        assert!(nodes.contains(&("p", "one ")));
        assert!(nodes.contains(&("em", "two")));
    }

    #[test]
    fn test_open_tag() {
        let doc = Html::parse_document(r#"<video id="v" src="a.mp4"><source src="a.mp4"></video>"#);
        assert_eq!(open_tag(first(&doc, "video")), r#"<video id="v" src="a.mp4">"#);
    }

    #[test]
    fn test_should_have_md() {
        let dir = TempDir::new().unwrap();
        let slugs = vec!["404".to_string()];

        let page = dir.path().join("post.html");
        fs::write(&page, "<html><body><p>x</p></body></html>").unwrap();
        assert!(should_have_md(&page, &slugs).unwrap());

        let redirect = dir.path().join("old.html");
        fs::write(&redirect, r#"<meta http-equiv="refresh" content="0; url=/post">"#).unwrap();
        assert!(!should_have_md(&redirect, &slugs).unwrap());

        assert!(!should_have_md(&dir.path().join("404.html"), &slugs).unwrap());
        assert!(!should_have_md(&dir.path().join("tags/ai.html"), &slugs).unwrap());
    }
}
