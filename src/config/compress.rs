//! `[compress]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[compress]` section in sitekit.toml - encoder quality knobs.
///
/// # Example
/// ```toml
/// [compress]
/// image_quality = 56   # AVIF quality, 0-100
/// hevc_crf = 28        # 0-51, lower is better
/// vp9_crf = 31         # 0-63, lower is better
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct CompressConfig {
    #[serde(default = "defaults::compress::image_quality")]
    #[educe(Default = defaults::compress::image_quality())]
    pub image_quality: u8,

    #[serde(default = "defaults::compress::hevc_crf")]
    #[educe(Default = defaults::compress::hevc_crf())]
    pub hevc_crf: u8,

    #[serde(default = "defaults::compress::vp9_crf")]
    #[educe(Default = defaults::compress::vp9_crf())]
    pub vp9_crf: u8,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_compress_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();
        assert_eq!(config.compress.image_quality, 56);
        assert_eq!(config.compress.hevc_crf, 28);
        assert_eq!(config.compress.vp9_crf, 31);
    }

    #[test]
    fn test_compress_rejects_negative() {
        let config = r#"
            [compress]
            hevc_crf = -1
        "#;
        let result: Result<SiteConfig, _> = toml::from_str(config);
        assert!(result.is_err());
    }
}
