//! Text helpers shared by the validators.

use anyhow::{Result, bail};
use regex::Regex;
use std::sync::LazyLock;

/// Marks where code or math was cut out, so neighbouring text cannot join up.
pub const BOUNDARY_MARK: char = '\u{FFFF}';

static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static DISPLAY_MATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\$\$.*?\$\$").unwrap());

/// How a finding is shortened before it lands in a report.
#[derive(Debug, Clone, Copy)]
pub struct TruncateOpts<'a> {
    /// Keep the tail instead of the head
    pub show_end: bool,
    pub preview_chars: usize,
    pub prefix: &'a str,
}

impl Default for TruncateOpts<'_> {
    fn default() -> Self {
        Self {
            show_end: false,
            preview_chars: 100,
            prefix: "",
        }
    }
}

impl<'a> TruncateOpts<'a> {
    pub fn prefix(prefix: &'a str) -> Self {
        Self {
            prefix,
            ..Self::default()
        }
    }
}

/// Push `prefix + text` onto `list`, shortened to `preview_chars` characters.
///
/// Empty text is dropped.
pub fn append_to_list(list: &mut Vec<String>, text: &str, opts: TruncateOpts<'_>) -> Result<()> {
    if opts.preview_chars == 0 {
        bail!("preview_chars must be greater than 0");
    }
    if text.is_empty() {
        return Ok(());
    }

    let len = text.chars().count();
    let shown = if len <= opts.preview_chars {
        text.to_owned()
    } else if opts.show_end {
        let tail: String = text.chars().skip(len - opts.preview_chars).collect();
        tail + "..."
    } else {
        text.chars().take(opts.preview_chars).collect()
    };

    list.push(format!("{}{shown}", opts.prefix));
    Ok(())
}

/// Like [`append_to_list`] with the default preview length, which cannot fail.
pub fn push_truncated(list: &mut Vec<String>, text: &str, prefix: &str) {
    let _ = append_to_list(list, text, TruncateOpts::prefix(prefix));
}

/// Strip fenced code, inline code, display math and inline math, in that order.
///
/// With `mark_boundaries`, every removed span leaves a [`BOUNDARY_MARK`].
pub fn remove_code_and_math(text: &str, mark_boundaries: bool) -> String {
    let mut mark = [0u8; 4];
    let replacement: &str = if mark_boundaries {
        BOUNDARY_MARK.encode_utf8(&mut mark)
    } else {
        ""
    };

    let text = FENCED_CODE.replace_all(text, replacement);
    let text = remove_delimited(&text, '`', replacement);
    let text = DISPLAY_MATH.replace_all(&text, replacement);
    remove_delimited(&text, '$', replacement)
}

/// Remove spans opened by an unescaped `delim` and closed by the next `delim`,
/// provided that closing one is unescaped too.
fn remove_delimited(text: &str, delim: char, replacement: &str) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = String::with_capacity(text.len());
    let mut copied_to = 0;
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        let escaped = i > 0 && chars[i - 1].1 == '\\';
        if c != delim || escaped {
            i += 1;
            continue;
        }

        let Some(j) = (i + 1..chars.len()).find(|&j| chars[j].1 == delim) else {
            break;
        };
        if j > i + 1 && chars[j - 1].1 == '\\' {
            i += 1;
            continue;
        }

        let end = chars[j].0 + delim.len_utf8();
        out.push_str(&text[copied_to..start]);
        out.push_str(replacement);
        copied_to = end;
        i = j + 1;
    }

    out.push_str(&text[copied_to..]);
    out
}

/// 1-based line number of a byte offset.
pub fn line_number(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset.min(text.len())].matches('\n').count() + 1
}

/// Render strings the way a Python list literal prints, e.g. `['"', "'"]`.
pub fn quoted_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|s| {
            if s.contains('\'') && !s.contains('"') {
                format!("\"{s}\"")
            } else {
                format!("'{}'", s.replace('\'', "\\'"))
            }
        })
        .collect();
    format!("[{}]", quoted.join(", "))
}
