//! Location rules for assets under `quartz/static`.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("The path must be within a 'quartz' directory.")]
    NotInQuartz,

    #[error("The path must be within the 'static' subdirectory of 'quartz'.")]
    NotInStatic,
}

/// Path of `input` relative to the parent of its nearest `quartz` ancestor.
///
/// Some directory strictly below that `quartz` must be named `static`.
///
/// ```ignore
/// path_relative_to_quartz_parent("/site/quartz/static/a.png") // quartz/static/a.png
/// ```
pub fn path_relative_to_quartz_parent(input: &Path) -> Result<PathBuf, PathError> {
    let quartz = input
        .ancestors()
        .skip(1)
        .find(|p| p.file_name().is_some_and(|n| n == "quartz"))
        .ok_or(PathError::NotInQuartz)?;

    let in_static = input
        .ancestors()
        .skip(1)
        .take_while(|p| *p != quartz)
        .any(|p| p.file_name().is_some_and(|n| n == "static"));
    if !in_static {
        return Err(PathError::NotInStatic);
    }

    let parent = quartz.parent().unwrap_or(Path::new(""));
    Ok(input
        .strip_prefix(parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| input.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        let cases = [
            ("/home/user/quartz/static/image.png", "quartz/static/image.png"),
            ("/quartz/static/nested/video.mp4", "quartz/static/nested/video.mp4"),
            ("quartz/static/a.gif", "quartz/static/a.gif"),
            ("/a/quartz/b/static/c.jpg", "quartz/b/static/c.jpg"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                path_relative_to_quartz_parent(Path::new(input)).unwrap(),
                PathBuf::from(expected),
                "{input}"
            );
        }
    }

    #[test]
    fn test_not_in_quartz() {
        assert_eq!(
            path_relative_to_quartz_parent(Path::new("/home/user/static/image.png")),
            Err(PathError::NotInQuartz)
        );
    }

    #[test]
    fn test_not_in_static() {
        assert_eq!(
            path_relative_to_quartz_parent(Path::new("/home/user/quartz/images/a.png")),
            Err(PathError::NotInStatic)
        );
    }

    #[test]
    fn test_static_above_quartz_does_not_count() {
        assert_eq!(
            path_relative_to_quartz_parent(Path::new("/static/quartz/a.png")),
            Err(PathError::NotInStatic)
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PathError::NotInQuartz.to_string(),
            "The path must be within a 'quartz' directory."
        );
    }
}
