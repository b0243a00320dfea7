//! Prose checks: unrendered markdown leftovers, typography and spacing.

use crate::{
    html::{get_text, has_class, non_code_text, select, should_skip, stripped_strings, text_nodes},
    utils::text::{TruncateOpts, append_to_list, push_truncated, quoted_list},
};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

const EMPHASIS_TAGS: &str = "p, dt, figcaption, dd, li, h1, h2, h3, h4, h5, h6";

static PARAGRAPH_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:: |#+ )").unwrap());
static CALLOUT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"> \[![a-zA-Z]+\]").unwrap());
static CLOSING_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<\w+>$").unwrap());
static FOOTNOTE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\^[a-zA-Z0-9\-_]+\]").unwrap());
static QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["']"#).unwrap());
static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[~–—\-]{2,}").unwrap());
static RAW_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[a-zA-Z][a-zA-Z0-9]*(?: |/?>)").unwrap());

/// Caption markers that should have been turned into captions.
const CAPTION_MARKERS: &[&str] = &["Table: ", "Figure: ", "Code: ", "Caption: "];

fn is_problematic_text(text: &str) -> bool {
    CALLOUT.is_match(text) || CAPTION_MARKERS.iter().any(|m| text.contains(m))
}

fn inside_code(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| el.value().name() == "code")
}

/// Direct text children of `element`.
fn own_text(element: ElementRef<'_>) -> impl Iterator<Item = &str> {
    element
        .children()
        .filter_map(|child| child.value().as_text().map(|t| &**t))
}

// ============================================================================
// Unrendered Markdown
// ============================================================================

/// Definition-list and heading syntax, callouts and caption markers left as text.
pub fn problematic_paragraphs(doc: &Html) -> Vec<String> {
    const PREFIX: &str = "Problematic paragraph: ";
    let mut problems = Vec::new();

    for element in select(doc, "p, dt") {
        let text = get_text(element);
        if PARAGRAPH_START.is_match(&text) {
            push_truncated(&mut problems, &text, PREFIX);
        }

        for node in element.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let in_code = node.parent().and_then(ElementRef::wrap).is_some_and(inside_code);
            let text = text.trim();
            if !in_code && is_problematic_text(text) {
                push_truncated(&mut problems, text, PREFIX);
            }
        }
    }

    for element in select(doc, "article, blockquote") {
        for text in own_text(element).map(str::trim) {
            if is_problematic_text(text) {
                push_truncated(&mut problems, text, PREFIX);
            }
        }
    }

    problems
}

/// Blockquotes whose last line still ends in a stray `>`.
pub fn trailing_blockquotes(doc: &Html) -> Vec<String> {
    let mut problems = Vec::new();
    for blockquote in select(doc, "blockquote") {
        let strings = stripped_strings(blockquote);
        if let Some(last) = strings.last()
            && last.ends_with('>')
            && !CLOSING_TAG.is_match(last)
        {
            push_truncated(&mut problems, &strings.join(" "), "Problematic blockquote: ");
        }
    }
    problems
}

pub fn problematic_katex(doc: &Html) -> Vec<String> {
    let mut problems = Vec::new();
    for error in select(doc, ".katex-error") {
        push_truncated(&mut problems, get_text(error).trim(), "KaTeX error: ");
    }
    problems
}

/// Display math whose source started with a blockquote marker.
pub fn katex_outside_blockquote(doc: &Html) -> Vec<String> {
    let mut problems = Vec::new();
    for display in select(doc, ".katex-display") {
        let text = get_text(display);
        let text = text.trim();
        if text.starts_with('>') {
            push_truncated(&mut problems, text, "KaTeX error: ");
        }
    }
    problems
}

pub fn unrendered_subtitles(doc: &Html) -> Vec<String> {
    let mut problems = Vec::new();
    for p in select(doc, "p") {
        let text = get_text(p);
        let text = text.trim();
        if text.starts_with("Subtitle:") && !has_class(p, "subtitle") {
            push_truncated(&mut problems, text, "Unrendered subtitle: ");
        }
    }
    problems
}

/// Raw `[^id]` footnote references.
pub fn unrendered_footnotes(doc: &Html) -> Vec<String> {
    select(doc, "p")
        .into_iter()
        .flat_map(|p| {
            let text = get_text(p);
            FOOTNOTE_REF
                .find_iter(&text)
                .map(|m| m.as_str().to_owned())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// `>! spoiler` syntax that stayed a paragraph.
pub fn unrendered_spoilers(doc: &Html) -> Vec<String> {
    let mut problems = Vec::new();
    for blockquote in select(doc, "blockquote") {
        for p in blockquote
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "p")
        {
            let text = get_text(p);
            let text = text.trim();
            if text.starts_with("! ") {
                push_truncated(&mut problems, text, "Unrendered spoiler: ");
            }
        }
    }
    problems
}

/// `*` anywhere, or `_` not followed by `_* +%`.
fn has_unrendered_emphasis(text: &str) -> bool {
    if text.contains('*') {
        return true;
    }
    text.match_indices('_').any(|(i, _)| {
        let rest = text[i + 1..].trim_start_matches('_');
        let after_spaces = rest.trim_start_matches(' ');
        !(after_spaces.len() < rest.len() && after_spaces.starts_with('%'))
    })
}

/// Stray `*` and `_` in prose outside code and math.
pub fn unrendered_emphasis(doc: &Html) -> Vec<String> {
    let mut problems = Vec::new();
    let opts = TruncateOpts {
        show_end: true,
        ..TruncateOpts::prefix("Unrendered emphasis: ")
    };
    for element in select(doc, EMPHASIS_TAGS) {
        let text = non_code_text(element);
        let text = text.trim();
        if !text.is_empty() && has_unrendered_emphasis(text) {
            let _ = append_to_list(&mut problems, text, opts);
        }
    }
    problems
}

// ============================================================================
// Typography
// ============================================================================

/// Text nodes of prose, skipping code and unformatted regions.
fn prose_nodes(doc: &Html) -> impl Iterator<Item = &str> {
    text_nodes(doc)
        .into_iter()
        .filter(|(parent, text)| !text.trim().is_empty() && !should_skip(*parent))
        .map(|(_, text)| text)
}

/// Straight quotes the typography pass should have curled.
pub fn unprocessed_quotes(doc: &Html) -> Vec<String> {
    let mut problems = Vec::new();
    for text in prose_nodes(doc) {
        let quotes: Vec<&str> = QUOTES.find_iter(text).map(|m| m.as_str()).collect();
        if !quotes.is_empty() {
            let prefix = format!("Unprocessed quotes {}: ", quoted_list(&quotes));
            push_truncated(&mut problems, text, &prefix);
        }
    }
    problems
}

/// Runs of hyphens or tildes that should have become dashes.
pub fn unprocessed_dashes(doc: &Html) -> Vec<String> {
    let mut problems = Vec::new();
    for text in prose_nodes(doc) {
        if DASHES.is_match(text) {
            push_truncated(&mut problems, text, "Unprocessed dashes: ");
        }
    }
    problems
}

/// Tag syntax that leaked into text.
pub fn unrendered_html(doc: &Html) -> Vec<String> {
    let mut problems = Vec::new();
    for text in prose_nodes(doc) {
        let text = text.trim();
        let tags: Vec<&str> = RAW_TAG.find_iter(text).map(|m| m.as_str()).collect();
        if !tags.is_empty() {
            let prefix = format!("Unrendered HTML {}: ", quoted_list(&tags));
            push_truncated(&mut problems, text, &prefix);
        }
    }
    problems
}

/// A period followed by another, possibly with quotes between; `..?` is fine.
fn has_consecutive_periods(text: &str) -> bool {
    text.match_indices('.').any(|(i, _)| {
        let rest = &text[i..];
        if rest.starts_with("..?") {
            return false;
        }
        rest[1..].trim_start_matches(['"', '“', '”']).starts_with('.')
    })
}

pub fn consecutive_periods(doc: &Html) -> Vec<String> {
    let mut problems = Vec::new();
    for text in prose_nodes(doc) {
        if has_consecutive_periods(text) {
            push_truncated(&mut problems, text, "Consecutive periods found: ");
        }
    }
    problems
}

// ============================================================================
// Spacing
// ============================================================================

static SPACE_BEFORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^.*[\[\(\{\-—~×“=+‘ \n\t\r]$").unwrap());
static SPACE_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[\]\)\}\.,;!\?:\-—~×+”…=’ \n\t\r].*$").unwrap());

#[derive(Clone, Copy)]
enum Side {
    Before,
    After,
}

fn sibling_text<'a>(element: ElementRef<'a>, side: Side) -> Option<&'a str> {
    let sibling = match side {
        Side::Before => element.prev_sibling(),
        Side::After => element.next_sibling(),
    }?;
    sibling.value().as_text().map(|t| &**t)
}

fn check_spacing(element: ElementRef<'_>, side: Side) -> Option<String> {
    let sibling = sibling_text(element, side)?;
    if sibling.trim().is_empty() {
        return None;
    }

    let name = element.value().name();
    let text = get_text(element);
    match side {
        Side::Before if !SPACE_BEFORE.is_match(sibling) => {
            Some(format!("Missing space before: {sibling}<{name}>{text}</{name}>"))
        }
        Side::After if !SPACE_AFTER.is_match(sibling) => {
            Some(format!("Missing space after: <{name}>{text}</{name}>{sibling}"))
        }
        _ => None,
    }
}

fn spacing_issues<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
    let mut problems = Vec::new();
    for element in elements {
        for side in [Side::Before, Side::After] {
            if let Some(issue) = check_spacing(element, side) {
                push_truncated(&mut problems, &issue, "");
            }
        }
    }
    problems
}

/// Emphasis glued to neighbouring words.
pub fn emphasis_spacing(doc: &Html) -> Vec<String> {
    let elements = select(doc, "em, strong, i, b, del");
    spacing_issues(elements.into_iter().filter(|el| {
        // "Some<em>thing</em>" style word play is deliberate
        let whitelisted = match (
            sibling_text(*el, Side::Before),
            sibling_text(*el, Side::After),
        ) {
            (Some(prev), Some(_)) => prev.trim().ends_with("Some"),
            _ => false,
        };
        !whitelisted
    }))
}

/// Links glued to neighbouring words, footnote references excepted.
pub fn link_spacing(doc: &Html) -> Vec<String> {
    let links = select(doc, "a");
    spacing_issues(
        links
            .into_iter()
            .filter(|a| !a.value().attr("href").unwrap_or_default().starts_with("#user-content-fn")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    // ------------------------------------------------------------------------
    // Unrendered markdown
    // ------------------------------------------------------------------------

    #[test]
    fn test_problematic_paragraphs() {
        let html = doc(r#"
            <p>: definition leftover</p>
            <p>## heading leftover</p>
            <p>Table: caption stayed text</p>
            <p><code>Figure: in code is fine</code></p>
            <blockquote>> [!note] callout</blockquote>
            <p>normal</p>
        "#);
        let problems = problematic_paragraphs(&html);
        assert_eq!(problems.len(), 4);
        assert_eq!(problems[0], "Problematic paragraph: : definition leftover");
        assert_eq!(problems[1], "Problematic paragraph: ## heading leftover");
        assert_eq!(problems[2], "Problematic paragraph: Table: caption stayed text");
        assert_eq!(problems[3], "Problematic paragraph: > [!note] callout");
    }

    #[test]
    fn test_trailing_blockquotes() {
        let html = doc(r#"
            <blockquote><p>quoted</p><p>trailing &gt;</p></blockquote>
            <blockquote><p>fine &lt;br&gt;</p></blockquote>
        "#);
        assert_eq!(trailing_blockquotes(&html), vec!["Problematic blockquote: quoted trailing >"]);
    }

    #[test]
    fn test_katex_checks() {
        let html = doc(r#"
            <span class="katex-error">\frac{</span>
            <span class="katex-display">&gt; x</span>
            <span class="katex-display">y</span>
        "#);
        assert_eq!(problematic_katex(&html), vec![r"KaTeX error: \frac{"]);
        assert_eq!(katex_outside_blockquote(&html), vec!["KaTeX error: > x"]);
    }

    #[test]
    fn test_unrendered_subtitles() {
        let html = doc(r#"<p>Subtitle: raw</p><p class="subtitle">Subtitle: fine</p>"#);
        assert_eq!(unrendered_subtitles(&html), vec!["Unrendered subtitle: Subtitle: raw"]);
    }

    #[test]
    fn test_unrendered_footnotes() {
        let html = doc("<p>Claim[^1] and another[^note-2].</p>");
        assert_eq!(unrendered_footnotes(&html), vec!["[^1]", "[^note-2]"]);
    }

    #[test]
    fn test_unrendered_spoilers() {
        let html = doc("<blockquote><p>! hidden</p></blockquote><p>! not quoted</p>");
        assert_eq!(unrendered_spoilers(&html), vec!["Unrendered spoiler: ! hidden"]);
    }

    #[test]
    fn test_has_unrendered_emphasis() {
        assert!(has_unrendered_emphasis("a *b* c"));
        assert!(has_unrendered_emphasis("snake_case"));
        assert!(!has_unrendered_emphasis("50_ %"));
        assert!(!has_unrendered_emphasis("x__  %"));
        assert!(!has_unrendered_emphasis("plain"));
    }

    #[test]
    fn test_unrendered_emphasis_skips_code() {
        let html = doc("<p>fine <code>a*b</code></p><li>bad *x*</li>");
        assert_eq!(unrendered_emphasis(&html), vec!["Unrendered emphasis: bad *x*"]);
    }

    // ------------------------------------------------------------------------
    // Typography
    // ------------------------------------------------------------------------

    #[test]
    fn test_unprocessed_quotes() {
        let html = doc(r#"<p>He said "hi"</p><code>"code"</code><p>curly “fine”</p>"#);
        assert_eq!(
            unprocessed_quotes(&html),
            vec![r#"Unprocessed quotes ['"', '"']: He said "hi""#]
        );
    }

    #[test]
    fn test_unprocessed_dashes() {
        let html = doc("<p>wait -- what</p><p>one-off</p><pre>a -- b</pre>");
        assert_eq!(unprocessed_dashes(&html), vec!["Unprocessed dashes: wait -- what"]);
    }

    #[test]
    fn test_unrendered_html() {
        let html = doc("<p>text &lt;div&gt; here &lt;/span&gt;</p><p>a &lt; b</p>");
        assert_eq!(
            unrendered_html(&html),
            vec!["Unrendered HTML ['<div>', '</span>']: text <div> here </span>"]
        );
    }

    #[test]
    fn test_consecutive_periods() {
        assert!(has_consecutive_periods("end.."));
        assert!(has_consecutive_periods(r#"said."."#));
        assert!(!has_consecutive_periods("what..?"));
        assert!(!has_consecutive_periods("one. two."));

        let html = doc("<p>Oops..</p><p>Fine.</p>");
        assert_eq!(consecutive_periods(&html), vec!["Consecutive periods found: Oops.."]);
    }

    // ------------------------------------------------------------------------
    // Spacing
    // ------------------------------------------------------------------------

    #[test]
    fn test_emphasis_spacing() {
        let html = doc("<p>word<em>glued</em> fine</p><p>ok <b>bold</b>after</p><p>(<i>x</i>)</p>");
        assert_eq!(
            emphasis_spacing(&html),
            vec![
                "Missing space before: word<em>glued</em>",
                "Missing space after: <b>bold</b>after"
            ]
        );
    }

    #[test]
    fn test_emphasis_spacing_whitelist() {
        let html = doc("<p>Some<em>thing</em>s</p>");
        assert!(emphasis_spacing(&html).is_empty());
    }

    #[test]
    fn test_link_spacing() {
        let html = doc(r##"<p>see<a href="/x">link</a>. note<a href="#user-content-fn-1">1</a></p>"##);
        assert_eq!(link_spacing(&html), vec!["Missing space before: see<a>link</a>"]);
    }
}
