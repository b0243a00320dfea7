//! Link checks: localhost leftovers, internal/external link shape, anchors.

use crate::html::{has_class, parse_html_file, select};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::LazyLock,
};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
    )
    .unwrap()
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?|ftp)://(?:[^\s:@/]+(?::[^\s@/]*)?@)?(?:localhost|\[[0-9a-f:.]+\]|(?:\d{1,3}\.){3}\d{1,3}|(?:[a-z0-9\u{00a1}-\u{ffff}](?:[a-z0-9\u{00a1}-\u{ffff}-]{0,61}[a-z0-9\u{00a1}-\u{ffff}])?\.)+[a-z\u{00a1}-\u{ffff}]{2,63})(?::\d{1,5})?(?:[/?#]\S*)?$",
    )
    .unwrap()
});

fn hrefs(doc: &Html, css: &str) -> Vec<String> {
    select(doc, css)
        .iter()
        .filter_map(|a| a.value().attr("href").map(str::to_owned))
        .collect()
}

/// Links that still point at a development server.
pub fn localhost_links(doc: &Html) -> Vec<String> {
    hrefs(doc, "a[href]")
        .into_iter()
        .filter(|href| {
            ["localhost:", "http://localhost", "https://localhost"]
                .iter()
                .any(|p| href.starts_with(p))
        })
        .collect()
}

/// `a.internal` without an href or pointing at an absolute `https://` URL.
pub fn invalid_internal_links(doc: &Html) -> Vec<String> {
    select(doc, "a.internal")
        .into_iter()
        .filter(|a| a.value().attr("href").is_none_or(|h| h.starts_with("https://")))
        .map(|a| a.html())
        .collect()
}

fn has_id(doc: &Html, id: &str) -> bool {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().id() == Some(id))
}

/// Anchors may be percent-encoded while ids never are.
fn anchor_exists(doc: &Html, anchor: &str) -> bool {
    has_id(doc, anchor)
        || urlencoding::decode(anchor).is_ok_and(|decoded| decoded != anchor && has_id(doc, &decoded))
}

/// Same-page `#x` anchors and cross-page `/page#x` anchors that go nowhere.
pub fn invalid_anchors(doc: &Html, base_dir: &Path) -> Vec<String> {
    let mut invalid = Vec::new();
    // Parsed target pages, or `None` when the file does not exist
    let mut pages: HashMap<PathBuf, Option<Html>> = HashMap::new();

    for href in hrefs(doc, "a[href]") {
        if let Some(anchor) = href.strip_prefix('#') {
            if !anchor_exists(doc, anchor) {
                invalid.push(format!("Invalid anchor: {href}"));
            }
            continue;
        }

        let Some((page, anchor)) = href.split_once('#') else {
            continue;
        };
        if !(href.starts_with('/') || href.starts_with('.')) {
            continue;
        }

        let mut target = base_dir.join(page.trim_start_matches(['.', '/']));
        if target.extension().is_none_or(|ext| ext != "html") {
            target.set_extension("html");
        }

        let parsed = pages.entry(target.clone()).or_insert_with(|| {
            target
                .is_file()
                .then(|| parse_html_file(&target).ok())
                .flatten()
        });
        if parsed.as_ref().is_none_or(|page| !anchor_exists(page, anchor)) {
            invalid.push(format!("Invalid anchor: {href}"));
        }
    }

    invalid
}

/// Mail links with a bad address, and external links that are not URLs.
pub fn malformed_hrefs(doc: &Html) -> Vec<String> {
    let mut malformed = Vec::new();

    for a in select(doc, "a[href]") {
        let Some(href) = a.value().attr("href") else {
            continue;
        };

        if href.starts_with("mailto:") {
            let email = href.split(':').nth(1).unwrap_or_default();
            if !EMAIL.is_match(email) {
                malformed.push(format!("Syntactically invalid email: {href}"));
            }
            continue;
        }

        let local = ["/", "#", ".", "tel:"].iter().any(|p| href.starts_with(p));
        if has_class(a, "external") && !local && !href.contains(' ') && !URL.is_match(href) {
            malformed.push(format!("Syntactically invalid href: {href}"));
        }
    }

    malformed
}

// ============================================================================
// Ids
// ============================================================================

static NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\d+$").unwrap());

/// Ids used more than once, counting `id-1`, `id-2` variants towards `id`.
///
/// Ids inside `.flowchart` diagrams are ignored. Footnote back-references
/// are never reported but still count as variants of other ids.
pub fn duplicate_ids(doc: &Html) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for element in doc.root_element().descendants().filter_map(ElementRef::wrap) {
        let Some(id) = element.value().id() else {
            continue;
        };
        let in_flowchart = element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| el.value().classes().any(|c| c == "flowchart"));
        if in_flowchart {
            continue;
        }
        let count = counts.entry(id).or_default();
        if *count == 0 {
            order.push(id);
        }
        *count += 1;
    }

    let mut duplicates = Vec::new();
    for &id in &order {
        if id.starts_with("user-content-fnref-") {
            continue;
        }
        let count = counts[id];
        if count > 1 {
            duplicates.push(format!("{id} (found {count} times)"));
        }
        if NUMBERED.is_match(id) {
            continue;
        }

        let prefix = format!("{id}-");
        let variants: usize = order
            .iter()
            .filter(|other| other.starts_with(&prefix) && NUMBERED.is_match(other))
            .map(|other| counts[other])
            .sum();
        if variants > 0 {
            let total = count + variants;
            duplicates.push(format!(
                "{id} (found {total} times, including numbered variants)"
            ));
        }
    }

    duplicates
}
