//! Asset pipeline: encode images and videos for the web, then point the
//! markdown that embeds them at the new files.

pub mod compress;
pub mod convert;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("File '{}' not found.", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported file type '{0}'.")]
    UnsupportedType(String),

    #[error("Directory '{}' not found.", .0.display())]
    NotADirectory(PathBuf),

    #[error("{codec} quality (CRF) must be between 0 and {max}, got {value}.")]
    QualityOutOfRange {
        codec: &'static str,
        max: u8,
        value: u8,
    },

    #[error(
        "Missing required tools: {0}. Please install them (e.g. using brew install ffmpeg imagemagick)."
    )]
    MissingTools(String),
}
