//! `[paths]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[paths]` section in sitekit.toml - where sources and the built site live.
///
/// Relative paths are resolved against the project root.
///
/// # Example
/// ```toml
/// [paths]
/// content = "content"
/// public = "public"
/// fonts_scss = "quartz/styles/fonts.scss"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Markdown sources.
    #[serde(default = "defaults::paths::content")]
    #[educe(Default = defaults::paths::content())]
    pub content: PathBuf,

    /// Built site.
    #[serde(default = "defaults::paths::public")]
    #[educe(Default = defaults::paths::public())]
    pub public: PathBuf,

    /// SCSS entry point whose fonts are checked.
    #[serde(default = "defaults::paths::fonts_scss")]
    #[educe(Default = defaults::paths::fonts_scss())]
    pub fonts_scss: PathBuf,
}
