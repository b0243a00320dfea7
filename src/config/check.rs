//! `[check]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[check]` section in sitekit.toml - thresholds and opt-in checks.
///
/// # Example
/// ```toml
/// [check]
/// description_min = 10
/// description_max = 155
/// head_meta_bytes = 9216
/// check_fonts = false
/// rss = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    /// Shortest acceptable meta description, in characters.
    #[serde(default = "defaults::check::description_min")]
    #[educe(Default = defaults::check::description_min())]
    pub description_min: usize,

    /// Longest acceptable meta description, in characters.
    #[serde(default = "defaults::check::description_max")]
    #[educe(Default = defaults::check::description_max())]
    pub description_max: usize,

    /// `<meta>`/`<title>` tags must appear within this many leading bytes.
    #[serde(default = "defaults::check::head_meta_bytes")]
    #[educe(Default = defaults::check::head_meta_bytes())]
    pub head_meta_bytes: usize,

    /// Require the preloaded subfont on every page.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub check_fonts: bool,

    /// Validate `rss.xml` in the built site.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub rss: bool,
}
