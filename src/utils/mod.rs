//! Utility modules shared by the checks and the asset pipeline.

pub mod exec;
pub mod files;
pub mod frontmatter;
pub mod git;
pub mod paths;
pub mod text;
