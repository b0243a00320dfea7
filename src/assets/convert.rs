//! Convert staged assets and rewrite the markdown that embeds them.
//!
//! Images are replaced by their AVIF path. Videos (and GIFs, which become
//! looping muted videos) are replaced by a `<video>` carrying an HEVC and a
//! WebM `<source>`.

use super::{
    AssetError,
    compress::{self, ALLOWED_IMAGE_EXTENSIONS, ALLOWED_VIDEO_EXTENSIONS, dotted_extension},
};
use crate::{
    config::SiteConfig,
    exec, log,
    utils::{exec::SILENT_FILTER, files::get_files, paths::path_relative_to_quartz_parent},
};
use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

const ASSET_STAGING: &str = r"(?:\.?/asset_staging/)?";
const GIF_ATTRIBUTES: &str = "autoplay loop muted playsinline";

/// Extensions that are never deleted after conversion.
const KEPT_ORIGINALS: &[&str] = &[".mp4", ".webm", ".avif"];

static SPACE_BEFORE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +>").unwrap());
static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());
static VIDEO_FIGURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</video>\s*(<br/?>)?\s*Figure:").unwrap());

fn name_of(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Literal text for a regex replacement string.
fn escape_replacement(s: &str) -> String {
    s.replace('$', "$$")
}

// ============================================================================
// Patterns
// ============================================================================

/// Markdown, wiki-link or HTML embeddings of the video (or GIF) `file`.
pub fn video_original_pattern(file: &Path) -> String {
    let escaped = regex::escape(&name_of(file));
    let parens = format!(
        r#"!?\[(?P<markdown_alt_text>.*?)\]\({ASSET_STAGING}(?P<link_parens>[^\)"]*){escaped}\)"#
    );
    let brackets =
        format!(r#"!?\[\[{ASSET_STAGING}(?P<link_brackets>[^\)"]*){escaped}\]\]"#);

    let tag = if dotted_extension(file) == ".gif" {
        format!(
            r#"<img (?P<earlyTagInfo>[^>]*)src="{ASSET_STAGING}(?P<link_tag>[^\)"]*){escaped}"(?P<tagInfo>(?:[^>]*[^>/])?)(?P<endVideoTagInfo>)/?>"#
        )
    } else {
        let ext = regex::escape(dotted_extension(file).trim_start_matches('.'));
        format!(
            r#"<video (?P<earlyTagInfo>[^>]*)src="{ASSET_STAGING}(?P<link_tag>[^\)"]*){escaped}"(?P<tagInfo>[^>]*)(?:type="video/{ext}")?(?P<endVideoTagInfo>(?:[^>]*[^>/])?)(?:/>|></video>)"#
        )
    };

    format!("{parens}|{brackets}|{tag}")
}

/// Replacement for [`video_original_pattern`] matches.
pub fn video_replacement_pattern(file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|s| escape_replacement(&s.to_string_lossy()))
        .unwrap_or_default();

    let opening = if dotted_extension(file) == ".gif" {
        format!(r#"<video {GIF_ATTRIBUTES} alt="${{markdown_alt_text}}">"#)
    } else {
        r#"<video ${earlyTagInfo}${tagInfo}${endVideoTagInfo} alt="${markdown_alt_text}">"#
            .to_owned()
    };
    let link = "${link_parens}${link_brackets}${link_tag}";

    format!(
        r#"{opening}<source src="{link}{stem}.mp4" type="video/mp4; codecs=hvc1"><source src="{link}{stem}.webm" type="video/webm"></video>"#
    )
}

/// Pattern for references to the image `file`, and the AVIF path that
/// replaces them.
///
/// Fails unless `file` lives under `quartz/**/static`.
pub fn image_patterns(file: &Path) -> Result<(String, String)> {
    let relative = path_relative_to_quartz_parent(file)?;
    let relative = relative.strip_prefix("quartz").unwrap_or(&relative);
    let original = relative.to_string_lossy().replace('\\', "/");
    let avif = relative.with_extension("avif").to_string_lossy().replace('\\', "/");

    let pattern = format!(r"(?:\./|/)?(?:asset_staging/)?{}", regex::escape(&original));
    Ok((pattern, escape_replacement(&avif)))
}

/// Rewrite every match of `pattern` in `content`.
pub fn replace_content(content: &str, pattern: &Regex, replacement: &str) -> String {
    let replaced = pattern.replace_all(content, |caps: &Captures| {
        let mut expanded = String::new();
        caps.expand(replacement, &mut expanded);
        if !caps[0].contains(r#"alt="""#) {
            expanded = expanded.replace(r#"alt="""#, "");
        }
        let expanded = SPACE_BEFORE_CLOSE.replace_all(&expanded, ">");
        SPACE_RUNS.replace_all(&expanded, " ").into_owned()
    });
    VIDEO_FIGURE
        .replace_all(&replaced, "</video>\n\nFigure:")
        .into_owned()
}

// ============================================================================
// Conversion
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    pub remove_originals: bool,
    pub strip_metadata: bool,
    pub image_quality: u8,
    pub hevc_crf: u8,
    pub vp9_crf: u8,
}

impl ConvertOptions {
    pub fn from_config(config: &SiteConfig, remove_originals: bool, strip_metadata: bool) -> Self {
        Self {
            remove_originals,
            strip_metadata,
            image_quality: config.compress.image_quality,
            hevc_crf: config.compress.hevc_crf,
            vp9_crf: config.compress.vp9_crf,
        }
    }
}

fn strip_metadata(file: &Path) {
    // failures leave the encoded asset as is
    let _ = exec!(filter=&SILENT_FILTER; ["exiftool"]; "-all=", file, "--verbose");
}

/// Rewrite every markdown file under `md_dir`, returning how many changed.
fn rewrite_markdown(md_dir: &Path, pattern: &Regex, replacement: &str) -> Result<usize> {
    let mut changed = 0;
    for md in get_files(md_dir, &[".md"], true, &[]) {
        let content = fs::read_to_string(&md)
            .with_context(|| format!("Failed to read {}", md.display()))?;
        let updated = replace_content(&content, pattern, replacement);
        if updated != content {
            fs::write(&md, updated).with_context(|| format!("Failed to write {}", md.display()))?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Encode `file` and point the markdown under `md_dir` at the result.
pub fn convert_asset(file: &Path, md_dir: &Path, opts: ConvertOptions) -> Result<()> {
    if !file.is_file() {
        return Err(AssetError::NotFound(file.to_path_buf()).into());
    }
    if !md_dir.is_dir() {
        return Err(AssetError::NotADirectory(md_dir.to_path_buf()).into());
    }

    let ext = dotted_extension(file);
    let is_image = ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str());
    let (pattern, replacement) = if is_image {
        image_patterns(file)?
    } else if ALLOWED_VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        (video_original_pattern(file), video_replacement_pattern(file))
    } else {
        return Err(AssetError::UnsupportedType(ext).into());
    };
    let pattern = Regex::new(&pattern)
        .with_context(|| format!("Invalid reference pattern for {}", file.display()))?;

    if is_image {
        compress::image(file, opts.image_quality)?;
        if opts.strip_metadata {
            strip_metadata(&file.with_extension("avif"));
        }
    } else {
        compress::video(file, opts.hevc_crf, opts.vp9_crf)?;
        if opts.strip_metadata {
            strip_metadata(&file.with_extension("mp4"));
            strip_metadata(&file.with_extension("webm"));
        }
    }

    let changed = rewrite_markdown(md_dir, &pattern, &replacement)?;
    log!("convert"; "updated references to {} in {} files", name_of(file), changed);

    if opts.remove_originals && !KEPT_ORIGINALS.contains(&ext.as_str()) {
        fs::remove_file(file).with_context(|| format!("Failed to remove {}", file.display()))?;
    }
    Ok(())
}

/// Compressible files under `dir` that are neither hidden nor named in `ignore`.
pub fn collect_assets(dir: &Path, ignore: &[String]) -> Vec<PathBuf> {
    let extensions: Vec<&str> = ALLOWED_IMAGE_EXTENSIONS
        .iter()
        .chain(ALLOWED_VIDEO_EXTENSIONS)
        .copied()
        .collect();

    get_files(dir, &extensions, false, &[])
        .into_iter()
        .filter(|file| {
            let name = name_of(file);
            if ignore.contains(&name) {
                log!("convert"; "Ignoring file: {}", file.display());
                false
            } else if name.starts_with('.') {
                log!("convert"; "Skipping hidden file: {}", file.display());
                false
            } else {
                true
            }
        })
        .collect()
}

/// Entry point for `convert`: one file, or every asset under `asset_dir`.
pub fn run(
    config: &SiteConfig,
    file: Option<&Path>,
    asset_dir: Option<&Path>,
    ignore: &[String],
    opts: ConvertOptions,
) -> Result<()> {
    let md_dir = &config.paths.content;

    let files = match (file, asset_dir) {
        (Some(file), _) => vec![file.to_path_buf()],
        (None, Some(dir)) => {
            if !dir.is_dir() {
                return Err(AssetError::NotADirectory(dir.to_path_buf()).into());
            }
            collect_assets(dir, ignore)
        }
        (None, None) => Vec::new(),
    };

    for file in &files {
        convert_asset(file, md_dir, opts)?;
    }
    Ok(())
}
