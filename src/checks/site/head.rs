//! Document head checks and embedded iframes.

use crate::{
    html::select,
    probe::{UrlProbe, is_ok_status},
};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

static META_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<meta[^>]*>").unwrap());
static TITLE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<title[^>]*>").unwrap());

/// The head must inline exactly one critical stylesheet.
pub fn missing_critical_css(doc: &Html) -> bool {
    select(doc, "head style#critical-css").len() != 1
}

/// Description length bounds in characters.
#[derive(Debug, Clone, Copy)]
pub struct DescriptionBounds {
    pub min: usize,
    pub max: usize,
}

pub fn long_description(doc: &Html, bounds: DescriptionBounds) -> Vec<String> {
    let description = select(doc, r#"meta[name="description"]"#)
        .first()
        .and_then(|meta| meta.value().attr("content"))
        .filter(|content| !content.is_empty());
    let Some(description) = description else {
        return vec!["Description not found".to_owned()];
    };

    let len = description.chars().count();
    if len > bounds.max {
        vec![format!(
            "Description too long: {len} characters (recommended <= {})",
            bounds.max
        )]
    } else if len < bounds.min {
        vec![format!(
            "Description too short: {len} characters (recommended >= {})",
            bounds.min
        )]
    } else {
        Vec::new()
    }
}

/// `<meta>` and `<title>` tags that a crawler reading only the first
/// `limit` bytes would miss.
pub fn late_header_tags(content: &str, limit: usize) -> Vec<String> {
    if content.len() <= limit {
        return Vec::new();
    }

    let mut boundary = limit;
    while !content.is_char_boundary(boundary) {
        boundary -= 1;
    }
    let Some((late_head, _)) = content[boundary..].split_once("</head>") else {
        return Vec::new();
    };

    let kb = limit / 1024;
    [("meta", &*META_TAG), ("title", &*TITLE_TAG)]
        .into_iter()
        .flat_map(|(tag, re)| {
            re.find_iter(late_head)
                .map(move |m| format!("<{tag}> tag found after first {kb}KB: {}", m.as_str()))
        })
        .collect()
}

/// Iframes whose remote source does not answer.
pub fn problematic_iframes(doc: &Html, probe: &dyn UrlProbe) -> Vec<String> {
    let mut problems = Vec::new();

    for iframe in select(doc, "iframe") {
        let el = iframe.value();
        let Some(src) = el.attr("src").filter(|src| !src.is_empty()) else {
            continue;
        };
        let src = match src.strip_prefix("//") {
            Some(rest) => format!("https://{rest}"),
            None if src.starts_with(['/', '.']) => continue,
            None => src.to_owned(),
        };

        let description = format!(
            "title='{}' (alt='{}')",
            el.attr("title").unwrap_or_default(),
            el.attr("alt").unwrap_or_default()
        );
        match probe.head(&src) {
            Ok(status) if is_ok_status(status) => {}
            Ok(status) => problems.push(format!(
                "Iframe source {src} returned status {status}. Description: {description}"
            )),
            Err(err) => problems.push(format!(
                "Failed to load iframe source {src}: {err}. Description: {description}"
            )),
        }
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::fake::FakeProbe;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    const BOUNDS: DescriptionBounds = DescriptionBounds { min: 10, max: 155 };

    #[test]
    fn test_missing_critical_css() {
        assert!(missing_critical_css(&doc("<head></head>")));
        assert!(!missing_critical_css(&doc(
            r#"<head><style id="critical-css">body{}</style></head>"#
        )));
        assert!(missing_critical_css(&doc(
            r#"<head><style id="critical-css"></style><style id="critical-css"></style></head>"#
        )));
    }

    #[test]
    fn test_long_description() {
        assert_eq!(long_description(&doc("<head></head>"), BOUNDS), vec!["Description not found"]);

        let short = doc(r#"<meta name="description" content="tiny">"#);
        assert_eq!(
            long_description(&short, BOUNDS),
            vec!["Description too short: 4 characters (recommended >= 10)"]
        );

        let long = format!(r#"<meta name="description" content="{}">"#, "x".repeat(160));
        assert_eq!(
            long_description(&doc(&long), BOUNDS),
            vec!["Description too long: 160 characters (recommended <= 155)"]
        );

        let empty = doc(r#"<meta name="description" content="">"#);
        assert_eq!(long_description(&empty, BOUNDS), vec!["Description not found"]);

        let fine = doc(r#"<meta name="description" content="A reasonable description.">"#);
        assert!(long_description(&fine, BOUNDS).is_empty());
    }

    #[test]
    fn test_late_header_tags() {
        let padding = "x".repeat(40);
        let content = format!(
            "<html><head>{padding}<meta name=\"late\"><title>T</title></head><body><meta name=\"body\"></body></html>"
        );
        assert_eq!(
            late_header_tags(&content, 20),
            vec![
                r#"<meta> tag found after first 0KB: <meta name="late">"#,
                "<title> tag found after first 0KB: <title>"
            ]
        );
        assert!(late_header_tags(&content, content.len()).is_empty());
    }

    #[test]
    fn test_late_header_tags_without_head_end() {
        let content = format!("{}<meta name=\"x\">", "y".repeat(50));
        assert!(late_header_tags(&content, 10).is_empty());
    }

    #[test]
    fn test_problematic_iframes() {
        let html = doc(r#"
            <iframe src="https://ok.test/embed"></iframe>
            <iframe src="//gone.test/embed" title="Gone"></iframe>
            <iframe src="https://down.test/x" alt="alt text"></iframe>
            <iframe src="/local/embed"></iframe>
            <iframe src="./relative/embed"></iframe>
            <iframe src=""></iframe>
            <iframe src="about:blank"></iframe>
        "#);
        let probe = FakeProbe::with(&[("https://ok.test/embed", 200), ("https://gone.test/embed", 404)]);
        assert_eq!(
            problematic_iframes(&html, &probe),
            vec![
                "Iframe source https://gone.test/embed returned status 404. Description: title='Gone' (alt='')",
                "Failed to load iframe source https://down.test/x: connection refused. Description: title='' (alt='alt text')",
                "Failed to load iframe source about:blank: connection refused. Description: title='' (alt='')"
            ]
        );
    }
}
