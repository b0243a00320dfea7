//! Image and video encoding.
//!
//! Images become AVIF through ImageMagick. Videos become an HEVC `.mp4`
//! (tagged `hvc1` for Safari) plus a VP9 `.webm`, both through ffmpeg.

use super::AssetError;
use crate::{
    config::{HEVC_CRF_MAX, VP9_CRF_MAX},
    exec, log,
    utils::exec::{EMPTY_FILTER, FFMPEG_FILTER, exec, missing_tools},
};
use anyhow::{Context, Result};
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &[".jpeg", ".jpg", ".png"];
pub const ALLOWED_VIDEO_EXTENSIONS: &[&str] = &[".avi", ".gif", ".mov", ".mp4", ".mpeg", ".webm"];

const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe", "magick"];

/// Keeps both dimensions even, which yuv420p requires.
const EVEN_DIMENSIONS: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Fail unless every encoder binary is on `PATH`.
pub fn check_dependencies() -> Result<()> {
    let missing = missing_tools(REQUIRED_TOOLS);
    if !missing.is_empty() {
        return Err(AssetError::MissingTools(missing.join(", ")).into());
    }
    Ok(())
}

/// Lowercase extension with its leading dot, or `""`.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

fn ensure_input(path: &Path, allowed: &[&str]) -> Result<()> {
    if !path.is_file() {
        return Err(AssetError::NotFound(path.to_path_buf()).into());
    }
    let ext = dotted_extension(path);
    if !allowed.contains(&ext.as_str()) {
        return Err(AssetError::UnsupportedType(ext).into());
    }
    Ok(())
}

fn ensure_crf(codec: &'static str, value: u8, max: u8) -> Result<()> {
    if value > max {
        return Err(AssetError::QualityOutOfRange { codec, max, value }.into());
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn args(parts: &[&str]) -> Vec<OsString> {
    parts.iter().map(OsString::from).collect()
}

// ============================================================================
// Images
// ============================================================================

pub fn image_args(input: &Path, output: &Path, quality: u8) -> Vec<OsString> {
    let mut out = vec![input.into(), "-quality".into(), quality.to_string().into()];
    out.extend(args(&[
        "-strip",
        "-colorspace",
        "sRGB",
        "-define",
        "heic:preserve-color-profile=true",
    ]));
    out.push(output.into());
    out
}

/// Encode `path` to an AVIF sibling; an existing AVIF is left alone.
pub fn image(path: &Path, quality: u8) -> Result<()> {
    ensure_input(path, ALLOWED_IMAGE_EXTENSIONS)?;

    let output = path.with_extension("avif");
    if output.exists() {
        log!("compress"; "File '{}' already exists. Skipping conversion.", file_name(&output));
        return Ok(());
    }

    exec(None, &args(&["magick"]), &image_args(path, &output, quality), &EMPTY_FILTER)?;
    log!("compress"; "Successfully converted {} to {}", file_name(path), file_name(&output));
    Ok(())
}

// ============================================================================
// Videos
// ============================================================================

fn is_gif(path: &Path) -> bool {
    dotted_extension(path) == ".gif"
}

/// Whether the first video stream of `path` is already HEVC.
pub fn is_hevc(path: &Path) -> Result<bool> {
    let output = exec!(["ffprobe"];
        "-v", "error",
        "-select_streams", "v:0",
        "-show_entries", "stream=codec_name",
        "-of", "default=noprint_wrappers=1:nokey=1",
        path
    )?;
    Ok(String::from_utf8_lossy(&output.stdout).trim() == "hevc")
}

/// Hidden sibling that ffmpeg writes before it replaces `mp4`.
pub fn temp_path(mp4: &Path) -> PathBuf {
    let stem = mp4
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    mp4.with_file_name(format!(".{stem}.tmp.mp4"))
}

/// Flags shared by both encoders after the audio handling.
fn output_tail(output: &Path) -> Vec<OsString> {
    let mut out = args(&["-movflags", "+faststart", "-y", "-v", "error"]);
    out.push(output.into());
    out
}

pub fn hevc_args(input: &Path, output: &Path, crf: u8) -> Vec<OsString> {
    let mut out: Vec<OsString> = vec!["-i".into(), input.into()];
    out.extend(args(&["-c:v", "libx265", "-crf"]));
    out.push(crf.to_string().into());
    out.extend(args(&[
        "-x265-params",
        "log-level=warning",
        "-preset",
        "slower",
        "-vf",
        EVEN_DIMENSIONS,
        "-pix_fmt",
        "yuv420p",
        "-tag:v",
        "hvc1",
    ]));
    if is_gif(input) {
        out.extend(args(&["-an", "-loop", "0"]));
    } else {
        out.extend(args(&["-map", "0:v:0", "-map", "0:a?", "-c:a", "copy"]));
    }
    out.extend(output_tail(output));
    out
}

pub fn webm_args(input: &Path, output: &Path, crf: u8) -> Vec<OsString> {
    let mut out: Vec<OsString> = vec!["-i".into(), input.into()];
    out.extend(args(&["-c:v", "libvpx-vp9", "-crf"]));
    out.push(crf.to_string().into());
    out.extend(args(&[
        "-b:v",
        "0",
        "-vf",
        EVEN_DIMENSIONS,
        "-pix_fmt",
        "yuv420p",
        "-deadline",
        "good",
        "-cpu-used",
        "4",
        "-row-mt",
        "1",
        "-auto-alt-ref",
        "1",
    ]));
    if is_gif(input) {
        out.extend(args(&["-an", "-loop", "0"]));
    } else {
        out.extend(args(&["-map", "0:v:0", "-map", "0:a?", "-c:a", "libopus", "-b:a", "128k"]));
    }
    out.extend(output_tail(output));
    out
}

fn encode_hevc(path: &Path, crf: u8) -> Result<()> {
    let mp4 = path.with_extension("mp4");
    if dotted_extension(path) == ".mp4" && is_hevc(path)? {
        log!("compress"; "{} is already HEVC. Skipping conversion.", file_name(path));
        return Ok(());
    }

    let temp = temp_path(&mp4);
    if let Err(err) = exec(None, &args(&["ffmpeg"]), &hevc_args(path, &temp, crf), &FFMPEG_FILTER) {
        let _ = fs::remove_file(&temp);
        return Err(err);
    }
    fs::rename(&temp, &mp4)
        .with_context(|| format!("Failed to move {} to {}", temp.display(), mp4.display()))?;
    log!("compress"; "Successfully converted {} to {}", file_name(path), file_name(&mp4));
    Ok(())
}

fn encode_webm(path: &Path, crf: u8) -> Result<()> {
    let webm = path.with_extension("webm");
    if webm.exists() {
        log!("compress"; "File '{}' already exists. Skipping conversion.", file_name(&webm));
        return Ok(());
    }

    exec(None, &args(&["ffmpeg"]), &webm_args(path, &webm, crf), &FFMPEG_FILTER)?;
    log!("compress"; "Successfully converted {} to {}", file_name(path), file_name(&webm));
    Ok(())
}

/// Encode `path` to HEVC `.mp4` and VP9 `.webm` siblings.
pub fn video(path: &Path, hevc_crf: u8, vp9_crf: u8) -> Result<()> {
    ensure_input(path, ALLOWED_VIDEO_EXTENSIONS)?;
    ensure_crf("HEVC", hevc_crf, HEVC_CRF_MAX)?;
    ensure_crf("WebM", vp9_crf, VP9_CRF_MAX)?;

    encode_hevc(path, hevc_crf)?;
    encode_webm(path, vp9_crf)
}

/// Dispatch on the extension of `path`.
pub fn compress(path: &Path, quality_img: u8, hevc_crf: u8, vp9_crf: u8) -> Result<()> {
    if !path.is_file() {
        return Err(AssetError::NotFound(path.to_path_buf()).into());
    }
    let ext = dotted_extension(path);
    if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        image(path, quality_img)
    } else if ALLOWED_VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        video(path, hevc_crf, vp9_crf)
    } else {
        Err(AssetError::UnsupportedType(ext).into())
    }
}
