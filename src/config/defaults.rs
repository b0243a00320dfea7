//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [paths] Section Defaults
// ============================================================================

pub mod paths {
    use std::path::PathBuf;

    pub fn content() -> PathBuf {
        "content".into()
    }

    pub fn public() -> PathBuf {
        "public".into()
    }

    pub fn fonts_scss() -> PathBuf {
        "quartz/styles/fonts.scss".into()
    }
}

// ============================================================================
// [site] Section Defaults
// ============================================================================

pub mod site {
    pub fn asset_domains() -> Vec<String> {
        vec!["assets.turntrout.com".into()]
    }

    pub fn slugs_without_md() -> Vec<String> {
        ["404", "all-tags", "recent"].map(String::from).to_vec()
    }
}

// ============================================================================
// [check] Section Defaults
// ============================================================================

pub mod check {
    pub fn description_min() -> usize {
        10
    }

    /// Facebook truncates previews past this length
    pub fn description_max() -> usize {
        155
    }

    /// Bytes of `<head>` that link-preview scrapers read (9 KiB, not 10, to
    /// avoid splitting tags at the boundary)
    pub fn head_meta_bytes() -> usize {
        9 * 1024
    }
}

// ============================================================================
// [compress] Section Defaults
// ============================================================================

pub mod compress {
    pub fn image_quality() -> u8 {
        56
    }

    pub fn hevc_crf() -> u8 {
        28
    }

    pub fn vp9_crf() -> u8 {
        31
    }
}
