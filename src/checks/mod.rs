//! Validators for the built site and the markdown sources.
//!
//! Validators never fail on findings: every check appends to a per-file
//! [`Issues`](crate::report::Issues) and the caller decides the exit code.

pub mod site;
pub mod source;

use thiserror::Error;

/// Conditions that abort a validator run instead of being reported.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Markdown file for {0} not found")]
    MissingMarkdown(String),

    #[error("Invalid permalink {0}: not present in sequence data")]
    UnknownPermalink(String),
}
