//! Checks on the markdown body of a post.

use crate::utils::text::{line_number, remove_code_and_math};
use regex::Regex;
use std::sync::LazyLock;

static BARE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\([-A-Za-z_0-9:]+(\.md)?\)").unwrap());
static UNALIGNED_COLUMN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\|\s*-+\s*\|").unwrap());
static TRAILING_ATTRIBUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\{[^$`\\]*\}\s*$").unwrap());
static VIDEO_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<video[^>]*\s(src|type)\s*=").unwrap());
static SPACE_BEFORE_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["”)\]]\s+\."#).unwrap());

/// Links to a bare slug, which Quartz does not resolve.
pub fn invalid_links(text: &str) -> Vec<String> {
    BARE_LINK
        .find_iter(text)
        .map(|m| {
            format!(
                "Invalid markdown link at line {}: {}",
                line_number(text, m.start()),
                m.as_str()
            )
        })
        .collect()
}

/// `\tag{}` breaks KaTeX numbering; `\\tag{` is an escaped literal.
pub fn latex_tags(text: &str) -> Vec<String> {
    text.match_indices(r"\tag{")
        .filter(|(i, _)| !text[..*i].ends_with('\\'))
        .map(|(i, _)| format!(r"LaTeX \tag{{}} found at line {}", line_number(text, i)))
        .collect()
}

pub fn table_alignments(text: &str) -> Vec<String> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| UNALIGNED_COLUMN.is_match(line))
        .map(|(i, _)| {
            format!(
                "Table column at line {} missing alignment (should be :---, ---:, or :---:)",
                i + 1
            )
        })
        .collect()
}

/// A brace counts as escaped only behind exactly one backslash.
fn is_unescaped_brace(chars: &[char], i: usize) -> bool {
    let one = i >= 1 && chars[i - 1] == '\\';
    let two = i >= 2 && chars[i - 2] == '\\';
    !(one && !two)
}

/// Braces outside code and math that KaTeX or MDX would choke on.
///
/// Attribute blocks like `{.class}` at the end of a line are allowed.
pub fn unescaped_braces(text: &str) -> Vec<String> {
    let text = TRAILING_ATTRIBUTES.replace_all(text, "");
    let text = remove_code_and_math(&text, false);

    let mut issues = Vec::new();
    for line in text.lines() {
        let chars: Vec<char> = line.chars().collect();
        for (i, c) in chars.iter().enumerate() {
            if matches!(c, '{' | '}') && is_unescaped_brace(&chars, i) {
                issues.push(format!("Unescaped brace found in: {}", line.trim()));
            }
        }
    }
    issues
}

/// `<video>` sources must come from `<source>` children.
pub fn video_tags(text: &str) -> Vec<String> {
    VIDEO_ATTRIBUTE
        .find_iter(text)
        .map(|m| {
            format!(
                "Video tag contains forbidden 'src' or 'type' attribute: {}",
                m.as_str()
            )
        })
        .collect()
}

/// A closing quote, parenthesis or bracket separated from the period after it.
pub fn forbidden_patterns(text: &str) -> Vec<String> {
    let text = remove_code_and_math(text, true);
    SPACE_BEFORE_PERIOD
        .find_iter(&text)
        .map(|m| format!("Forbidden pattern found: {}", m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_links() {
        let text = "Intro\nSee [post](other-post) and [md](notes.md).\nFine: [x](/ok) [y](https://a.b)";
        assert_eq!(
            invalid_links(text),
            vec![
                "Invalid markdown link at line 2: ](other-post)",
                "Invalid markdown link at line 2: ](notes.md)"
            ]
        );
    }

    #[test]
    fn test_latex_tags() {
        let text = "$$x \\tag{1}$$\nliteral \\\\tag{2}\n";
        assert_eq!(latex_tags(text), vec![r"LaTeX \tag{} found at line 1"]);
    }

    #[test]
    fn test_table_alignments() {
        let text = "| a | b |\n| --- | :---: |\n| :-- | --: |";
        assert_eq!(
            table_alignments(text),
            vec!["Table column at line 2 missing alignment (should be :---, ---:, or :---:)"]
        );
    }

    // ------------------------------------------------------------------------
    // Braces
    // ------------------------------------------------------------------------

    #[test]
    fn test_unescaped_braces() {
        let text = "set {a, b} here\nescaped \\{ok\\}\nattrs {.class}\ndouble \\\\{bad} x\ncode `{x}` and math ${y}$";
        assert_eq!(
            unescaped_braces(text),
            vec![
                "Unescaped brace found in: set {a, b} here",
                "Unescaped brace found in: set {a, b} here",
                "Unescaped brace found in: double \\\\{bad} x",
                "Unescaped brace found in: double \\\\{bad} x"
            ]
        );
    }

    #[test]
    fn test_is_unescaped_brace() {
        let chars: Vec<char> = "{".chars().collect();
        assert!(is_unescaped_brace(&chars, 0));
        let chars: Vec<char> = "\\{".chars().collect();
        assert!(!is_unescaped_brace(&chars, 1));
        let chars: Vec<char> = "\\\\{".chars().collect();
        assert!(is_unescaped_brace(&chars, 2));
    }

    // ------------------------------------------------------------------------
    // Tags and punctuation
    // ------------------------------------------------------------------------

    #[test]
    fn test_video_tags() {
        let text = r#"<video src="a.mp4"></video><video autoplay><source src="a.mp4"></video>"#;
        assert_eq!(
            video_tags(text),
            vec![r#"Video tag contains forbidden 'src' or 'type' attribute: <video src="#]
        );
    }

    #[test]
    fn test_forbidden_patterns() {
        let text = "He said \"hi\" .\n(aside) .\n`code\" .`\nfine.";
        assert_eq!(
            forbidden_patterns(text),
            vec!["Forbidden pattern found: \" .", "Forbidden pattern found: ) ."]
        );
    }
}
