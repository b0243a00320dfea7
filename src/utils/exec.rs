//! External tool execution.
//!
//! Every encoder and helper binary (`magick`, `ffmpeg`, `ffprobe`,
//! `exiftool`, `sass`, `git`) is driven through the `exec!` macro so that
//! failures carry the tool name, exit status and filtered stderr.

use crate::log;
use anyhow::{Context, Result};
use regex::Regex;
use std::{
    ffi::OsString,
    path::Path,
    process::{Command, Output},
    sync::OnceLock,
};

// ============================================================================
// Macros
// ============================================================================

/// Run an external command with arguments.
///
/// # Examples
/// ```ignore
/// // Without working directory
/// exec!(["git"]; "status", "-s")?;
///
/// // With working directory
/// exec!(root; ["sass"]; "--load-path=styles", input)?;
///
/// // With custom filter
/// exec!(filter=&SILENT_FILTER; ["exiftool"]; "-all=", path)?;
/// ```
#[macro_export]
macro_rules! exec {
    (filter=$filter:expr; $($rest:tt)*) => {
        $crate::exec_internal!(@parse_root $filter; $($rest)*)
    };
    ($($rest:tt)*) => {
        $crate::exec_internal!(@parse_root &$crate::utils::exec::EMPTY_FILTER; $($rest)*)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! exec_internal {
    // Parse root and command (with root)
    (@parse_root $filter:expr; $root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::exec(
            Some($root),
            &$crate::utils::exec::internal::to_cmd_vec($cmd),
            &$crate::utils::exec::internal::filter_args(&[$($crate::utils::exec::internal::to_os($arg)),*]),
            $filter,
        )
    };
    // Parse command (without root)
    (@parse_root $filter:expr; $cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::exec(
            None,
            &$crate::utils::exec::internal::to_cmd_vec($cmd),
            &$crate::utils::exec::internal::filter_args(&[$($crate::utils::exec::internal::to_os($arg)),*]),
            $filter,
        )
    };
}

// ============================================================================
// Argument Conversion
// ============================================================================

#[doc(hidden)]
pub mod internal {
    use std::ffi::OsString;

    #[inline]
    pub fn to_os<S: Into<OsString>>(s: S) -> OsString {
        s.into()
    }

    pub trait ToCmd {
        fn to_cmd(self) -> Vec<OsString>;
    }

    impl<const N: usize> ToCmd for [&str; N] {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.into_iter().map(OsString::from).collect()
        }
    }

    impl ToCmd for &[OsString] {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.to_vec()
        }
    }

    impl ToCmd for &Vec<OsString> {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.clone()
        }
    }

    #[inline]
    pub fn to_cmd_vec<C: ToCmd>(cmd: C) -> Vec<OsString> {
        cmd.to_cmd()
    }

    /// Empty arguments are dropped, so optional flags can be passed as `""`.
    #[inline]
    pub fn filter_args(args: &[OsString]) -> Vec<OsString> {
        args.iter().filter(|a| !a.is_empty()).cloned().collect()
    }
}

// ============================================================================
// Command Execution
// ============================================================================

/// Execute a command and capture its output.
///
/// # Errors
/// Returns error if command fails to execute or returns non-zero exit code.
pub fn exec(
    root: Option<&Path>,
    cmd: &[OsString],
    args: &[OsString],
    filter: &'static FilterRule,
) -> Result<Output> {
    let (name, mut command) = prepare(root, cmd, args)?;

    let output = command
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))?;

    log_output(&name, &output, filter)?;
    Ok(output)
}

/// Check that every tool in `tools` is on `PATH`, returning the missing ones.
pub fn missing_tools<'a>(tools: &[&'a str]) -> Vec<&'a str> {
    tools
        .iter()
        .copied()
        .filter(|tool| which::which(tool).is_err())
        .collect()
}

fn prepare(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<(String, Command)> {
    let name = cmd
        .first()
        .and_then(|s| s.to_str())
        .context("Empty command")?
        .to_owned();

    let mut command = Command::new(&cmd[0]);
    command.args(&cmd[1..]).args(args);

    if let Some(dir) = root {
        command.current_dir(dir);
    }

    Ok((name, command))
}

// ============================================================================
// Output Filtering
// ============================================================================

fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(s, "")
}

/// Prefixes of stderr lines that are known noise.
pub struct FilterRule {
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    fn should_skip(&self, output: &str) -> bool {
        output.is_empty() || self.skip_prefixes.iter().any(|p| output.starts_with(p))
    }

    fn log(&self, name: &str, output: &str) {
        let valid_lines: Vec<&str> = output
            .lines()
            .filter(|line| {
                let plain = strip_ansi(line);
                let trimmed = plain.trim();
                !trimmed.is_empty() && !self.should_skip(trimmed)
            })
            .collect();

        if !valid_lines.is_empty() {
            log!(name; "{}", valid_lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

/// Silent filter: skip all output.
pub const SILENT_FILTER: FilterRule = FilterRule::new(&[""]);

/// x265 and libvpx chatter on stderr even at `-v error`.
pub const FFMPEG_FILTER: FilterRule = FilterRule::new(&["x265 [info]", "[libx265", "[libvpx"]);

fn log_output(name: &str, output: &Output, filter: &'static FilterRule) -> Result<()> {
    if !output.status.success() {
        anyhow::bail!(format_error(name, output, filter));
    }

    // On success, only log stderr (warnings) to reduce noise
    let stderr = String::from_utf8_lossy(&output.stderr);
    filter.log(name, stderr.trim());

    Ok(())
}

fn format_error(name: &str, output: &Output, filter: &'static FilterRule) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let error_msg = filter
        .skip_prefixes
        .iter()
        .filter(|p| !p.is_empty())
        .fold(stderr.trim(), |s, p| s.trim_start_matches(p).trim_start());

    let mut msg = format!("Command `{name}` failed with {}\n", output.status);
    if !error_msg.is_empty() {
        msg.push_str(error_msg);
    }

    let stdout_trimmed = stdout.trim();
    if !stdout_trimmed.is_empty() {
        msg.push_str("\nStdout:\n");
        msg.push_str(stdout_trimmed);
    }
    msg
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::exec::internal::*;

    #[test]
    fn test_to_cmd_vec_array() {
        let cmd = to_cmd_vec(["ffmpeg", "-i"]);
        assert_eq!(cmd, vec![OsString::from("ffmpeg"), OsString::from("-i")]);
    }

    #[test]
    fn test_filter_args_drops_empty() {
        let args = [OsString::from("-an"), OsString::from(""), OsString::from("-y")];
        let filtered = filter_args(&args);
        assert_eq!(filtered, vec![OsString::from("-an"), OsString::from("-y")]);
    }

    #[test]
    fn test_prepare_empty() {
        assert!(prepare(None, &[], &[]).is_err());
    }

    #[test]
    fn test_prepare_valid() {
        let cmd = to_cmd_vec(["magick"]);
        let (name, command) = prepare(None, &cmd, &[OsString::from("in.png")]).unwrap();
        assert_eq!(name, "magick");
        assert_eq!(command.get_args().count(), 1);
    }

    #[test]
    fn test_filter_rule() {
        let filter = FilterRule::new(&["x265 [info]"]);
        assert!(filter.should_skip("x265 [info]: HEVC encoder"));
        assert!(!filter.should_skip("Error opening input"));
        assert!(filter.should_skip(""));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[cfg(unix)]
    #[test]
    fn test_format_error_mentions_command() {
        let status = Command::new("false").status().unwrap();
        static TEST_FILTER: FilterRule = FilterRule::new(&["Ignored:"]);
        let output = Output {
            status,
            stdout: Vec::new(),
            stderr: b"Ignored: warning\nFatal error".to_vec(),
        };
        let msg = format_error("magick", &output, &TEST_FILTER);
        assert!(msg.contains("Command `magick` failed"));
        assert!(msg.contains("Fatal error"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_reports_failure() {
        let result = exec!(["false"];);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_tools() {
        let missing = missing_tools(&["definitely-not-a-real-tool-xyz"]);
        assert_eq!(missing, vec!["definitely-not-a-real-tool-xyz"]);
    }
}
