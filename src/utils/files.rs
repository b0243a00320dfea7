//! Recursive file discovery.

use super::git::IgnoreMatcher;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect files under `dir` whose names end with one of `extensions`.
///
/// Files with a path component in `ignore_dirs` are dropped. With
/// `use_git_ignore`, files excluded by the repository's root `.gitignore`
/// are dropped too; outside a repository the results are left unfiltered.
/// The result is sorted.
pub fn get_files(
    dir: &Path,
    extensions: &[&str],
    use_git_ignore: bool,
    ignore_dirs: &[&str],
) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| has_extension(path, extensions))
        .filter(|path| !in_ignored_dir(path, dir, ignore_dirs))
        .collect();

    if use_git_ignore && let Some(matcher) = IgnoreMatcher::for_repo_of(dir) {
        files.retain(|path| !matcher.is_ignored(path));
    }

    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let lower = name.to_lowercase();
    extensions.iter().any(|ext| lower.ends_with(&ext.to_lowercase()))
}

fn in_ignored_dir(path: &Path, root: &Path, ignore_dirs: &[&str]) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.parent().is_some_and(|parent| {
        parent
            .components()
            .any(|c| ignore_dirs.iter().any(|d| c.as_os_str() == *d))
    })
}
