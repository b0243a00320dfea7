//! `[site]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[site]` section in sitekit.toml - facts about the published site.
///
/// # Example
/// ```toml
/// [site]
/// asset_domains = ["assets.turntrout.com"]
/// slugs_without_md = ["404", "all-tags", "recent"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    /// Hosts allowed to serve absolute media URLs.
    #[serde(default = "defaults::site::asset_domains")]
    #[educe(Default = defaults::site::asset_domains())]
    pub asset_domains: Vec<String>,

    /// Generated pages that have no markdown source.
    #[serde(default = "defaults::site::slugs_without_md")]
    #[educe(Default = defaults::site::slugs_without_md())]
    pub slugs_without_md: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_site_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();
        assert_eq!(config.site.asset_domains, vec!["assets.turntrout.com"]);
        assert_eq!(config.site.slugs_without_md, vec!["404", "all-tags", "recent"]);
    }

    #[test]
    fn test_site_override() {
        let config = r#"
            [site]
            asset_domains = ["cdn.example.com", "media.example.com"]
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();
        assert_eq!(config.site.asset_domains.len(), 2);
    }
}
