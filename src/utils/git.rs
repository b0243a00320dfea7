//! Git work-tree discovery and `.gitignore` matching.

use anyhow::{Result, anyhow};
use gix::{bstr::ByteSlice, glob::wildmatch};
use std::{
    fs,
    path::{Path, PathBuf},
};

// Bits of gix::ignore::search::pattern::Mode
const MODE_NO_SUB_DIR: u32 = 1 << 0;
const MODE_MUST_MATCH_DIR: u32 = 1 << 2;
const MODE_NEGATIVE: u32 = 1 << 3;
const MODE_ABSOLUTE: u32 = 1 << 4;

/// Root of the work tree enclosing `start`.
pub fn git_root(start: &Path) -> Result<PathBuf> {
    let repo = gix::discover(start)?;
    repo.path()
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("Invalid repository path"))
}

/// Patterns of a single `.gitignore`, anchored at `base`.
pub struct IgnoreMatcher {
    base: PathBuf,
    patterns: Vec<(gix::bstr::BString, u32)>,
}

impl IgnoreMatcher {
    pub fn new(base: &Path, gitignore: &[u8]) -> Self {
        let patterns = gix::ignore::parse(gitignore)
            .map(|(pattern, _, _)| (pattern.text, pattern.mode.bits()))
            .collect();
        Self {
            base: base.to_path_buf(),
            patterns,
        }
    }

    /// Matcher for the `.gitignore` at the root of the work tree holding `dir`.
    ///
    /// `None` when `dir` is not inside a repository or no root `.gitignore` exists.
    pub fn for_repo_of(dir: &Path) -> Option<Self> {
        let root = git_root(dir).ok()?;
        let bytes = fs::read(root.join(".gitignore")).ok()?;
        Some(Self::new(&root, &bytes))
    }

    /// Whether the file at `path` is ignored, either directly or through one of
    /// its parent directories.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let abs = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let base = self.base.canonicalize().unwrap_or_else(|_| self.base.clone());
        let Ok(rel) = abs.strip_prefix(&base) else {
            return false;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");

        // git never re-includes a file whose parent directory is excluded
        let mut prefix = String::new();
        let components: Vec<&str> = rel.split('/').collect();
        for (i, part) in components.iter().enumerate() {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            let is_last = i + 1 == components.len();
            if self.matches(&prefix, !is_last) {
                return true;
            }
        }
        false
    }

    /// Match a slash-separated path relative to the `.gitignore` location.
    ///
    /// The last matching pattern wins and `!` patterns un-ignore.
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        let mut is_ignored = false;
        for (text, mode) in &self.patterns {
            if (mode & MODE_MUST_MATCH_DIR != 0) && !is_dir {
                continue;
            }

            let is_absolute = mode & MODE_ABSOLUTE != 0;
            let has_internal_slash = mode & MODE_NO_SUB_DIR == 0;

            // "*.log" matches any basename, "/a.log" and "a/b" match from the root
            let candidate = if !has_internal_slash && !is_absolute {
                path.rsplit_once('/').map_or(path, |(_, name)| name)
            } else {
                path
            };

            if wildmatch(
                text.as_bstr(),
                candidate.into(),
                wildmatch::Mode::NO_MATCH_SLASH_LITERAL,
            ) {
                is_ignored = mode & MODE_NEGATIVE == 0;
            }
        }
        is_ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn matcher(gitignore: &[u8]) -> IgnoreMatcher {
        IgnoreMatcher::new(Path::new("/"), gitignore)
    }

    #[test]
    fn test_basename_and_negation() {
        let m = matcher(b"*.md.bak\n!keep.md.bak\ndrafts/\n/TODO.md");

        assert!(m.matches("content/post.md.bak", false));
        assert!(!m.matches("content/keep.md.bak", false));
        assert!(m.matches("content/drafts", true));
        assert!(!m.matches("content/drafts", false));
        assert!(m.matches("TODO.md", false));
        assert!(!m.matches("content/TODO.md", false));
    }

    #[test]
    fn test_last_pattern_wins() {
        let m = matcher(b"*.md\n!post.md\npost.md");
        assert!(m.matches("post.md", false));
    }

    #[test]
    fn test_path_relative_pattern() {
        let m = matcher(b"content/private/*.md");
        assert!(m.matches("content/private/a.md", false));
        assert!(!m.matches("content/private/nested/a.md", false));
        assert!(!m.matches("content/a.md", false));
    }

    #[test]
    fn test_is_ignored_through_parent_directory() {
        let dir = TempDir::new().unwrap();
        let private = dir.path().join("private");
        fs::create_dir_all(&private).unwrap();
        let file = private.join("post.md");
        fs::write(&file, "x").unwrap();
        let kept = dir.path().join("kept.md");
        fs::write(&kept, "x").unwrap();

        let m = IgnoreMatcher::new(dir.path(), b"private/");
        assert!(m.is_ignored(&file));
        assert!(!m.is_ignored(&kept));
    }

    #[test]
    fn test_is_ignored_outside_base() {
        let dir = TempDir::new().unwrap();
        let m = IgnoreMatcher::new(&dir.path().join("sub"), b"*");
        assert!(!m.is_ignored(&dir.path().join("file.md")));
    }
}
