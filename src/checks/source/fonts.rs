//! Font checks over the compiled font stylesheet.

use crate::{exec, report::Issues};
use anyhow::Result;
use regex::Regex;
use std::{collections::HashSet, path::Path, sync::LazyLock};

static FONT_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)@font-face\s*\{[^}]*?src:\s*url\(\s*["']?(.*?)["']?\)\s*(?:format\([^\)]*\)\s*)?[^;]*;"#,
    )
    .unwrap()
});
static FONT_FAMILY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)@font-face\s*\{[^}]*?font-family:\s*["']?(.*?)["']?[;,]"#).unwrap()
});
static FONT_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"--[^:]*?:\s*["'](.*?)["']\s*(?:,|;)"#).unwrap());

const SYSTEM_FONTS: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-serif",
    "ui-sans-serif",
    "ui-monospace",
    "garamond",
    "times new roman",
    "courier new",
    "jetbrains mono",
];

/// Compile `scss` with `sass`, resolving imports from its directory.
///
/// A missing stylesheet compiles to nothing.
pub fn compile_scss(scss: &Path) -> Result<String> {
    if !scss.is_file() {
        return Ok(String::new());
    }
    let load_path = scss.parent().unwrap_or(Path::new("."));
    let output = exec!(["sass"]; format!("--load-path={}", load_path.display()), scss)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Local `@font-face` sources that do not exist under `root`.
pub fn missing_font_files(css: &str, root: &Path) -> Vec<String> {
    FONT_SRC
        .captures_iter(css)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .filter(|src| !["http:", "https:", "data:"].iter().any(|p| src.starts_with(p)))
        .map(|src| match src.strip_prefix("/static/") {
            Some(rest) => format!("/quartz/static/{rest}"),
            None => src.to_owned(),
        })
        .filter(|src| !root.join(src.trim_start_matches('/')).is_file())
        .collect()
}

fn clean_family(name: &str) -> String {
    let name = name.trim().trim_matches(['"', '\'']).to_lowercase();
    name.split(':').next().unwrap_or_default().to_owned()
}

/// Families named in custom properties that are neither system fonts nor
/// declared by an `@font-face`.
pub fn undeclared_font_families(css: &str) -> Vec<String> {
    let declared: HashSet<String> = FONT_FAMILY
        .captures_iter(css)
        .filter_map(|c| c.get(1).map(|m| clean_family(m.as_str())))
        .collect();

    let mut seen = HashSet::new();
    FONT_VARIABLE
        .captures_iter(css)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .flat_map(|list| list.split(','))
        .map(clean_family)
        .filter(|f| !f.is_empty() && !SYSTEM_FONTS.contains(&f.as_str()) && !declared.contains(f))
        .filter(|f| seen.insert(f.clone()))
        .map(|f| format!("Undeclared font family: {f}"))
        .collect()
}

/// Font report for the stylesheet at `scss`; font URLs resolve from `root`.
pub fn check_fonts(scss: &Path, root: &Path) -> Issues {
    let mut issues = Issues::new();
    match compile_scss(scss) {
        Ok(css) => {
            issues
                .list("missing_font_files", missing_font_files(&css, root))
                .list("undeclared_font_families", undeclared_font_families(&css));
        }
        Err(err) => {
            issues.list("scss_compilation", vec![format!("SCSS compilation error: {err}")]);
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CSS: &str = r#"
@font-face {
  font-family: "EB Garamond";
  src: url("/static/styles/fonts/ebgaramond.woff2") format("woff2");
}
@font-face {
  font-family: 'Remote';
  src: url(https://fonts.test/remote.woff2);
}
@font-face {
  font-family: Gone;
  src: url("/static/styles/fonts/gone.woff2");
}
:root {
  --font-text: "EB Garamond", serif;
  --font-code: "Fira Code", monospace;
  --font-dropcap: "Fira Code";
}
"#;

    #[test]
    fn test_missing_font_files() {
        let dir = TempDir::new().unwrap();
        let fonts = dir.path().join("quartz/static/styles/fonts");
        fs::create_dir_all(&fonts).unwrap();
        fs::write(fonts.join("ebgaramond.woff2"), "").unwrap();

        assert_eq!(
            missing_font_files(CSS, dir.path()),
            vec!["/quartz/static/styles/fonts/gone.woff2"]
        );
    }

    #[test]
    fn test_undeclared_font_families() {
        assert_eq!(undeclared_font_families(CSS), vec!["Undeclared font family: fira code"]);
    }

    #[test]
    fn test_clean_family() {
        assert_eq!(clean_family(" 'EB Garamond' "), "eb garamond");
        assert_eq!(clean_family("Inter:wght@400"), "inter");
    }

    #[test]
    fn test_missing_stylesheet_compiles_to_nothing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(compile_scss(&dir.path().join("fonts.scss")).unwrap(), "");

        let issues = check_fonts(&dir.path().join("fonts.scss"), dir.path());
        assert!(!issues.has_issues());
    }
}
