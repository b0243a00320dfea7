//! Terminal logging with colored prefixes and a progress bar.
//!
//! ```ignore
//! log!("convert"; "rewrote {} references", count);
//!
//! let progress = ProgressBar::new("html", files.len());
//! files.par_iter().for_each(|_| progress.inc());
//! progress.finish();
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{IsTerminal, Write, stdout},
    sync::{
        Mutex, OnceLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

/// Whether a progress bar currently owns the last terminal line
static BAR_ACTIVE: AtomicBool = AtomicBool::new(false);

// ============================================================================
// Layout Constants
// ============================================================================
//
// Progress bar format: "[html] [████░░░░] 42/100"
//                       ^----^ ^-------^ ^----^
//                       prefix bar       count

/// Length of brackets around module name: "[]"
const BRACKET_LEN: usize = 2;
/// Space after prefix: "[module] " <- this space
const SPACE_AFTER_PREFIX: usize = 1;
/// Bar wrapper: " []" (space + brackets around progress bar)
const BAR_WRAPPER_LEN: usize = 3;
/// Space before count: "...] 42/100" <- this space
const SPACE_BEFORE_COUNT: usize = 1;
const MIN_BAR_WIDTH: usize = 10;
const MAX_BAR_WIDTH: usize = 40;

/// Display length of `[module] `.
#[inline]
const fn calc_prefix_len(module_len: usize) -> usize {
    module_len + BRACKET_LEN + SPACE_AFTER_PREFIX
}

/// Falls back to 120 columns if detection fails.
fn get_terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

// ============================================================================
// Progress Bar
// ============================================================================

/// A single in-place progress bar on the last terminal line.
///
/// `inc` may be called from rayon workers; rendering is serialized by a mutex.
/// Nothing is drawn when stdout is not a terminal.
pub struct ProgressBar {
    prefix: ColoredString,
    prefix_len: usize,
    total: usize,
    current: AtomicUsize,
    enabled: bool,
    lock: Mutex<()>,
}

impl ProgressBar {
    pub fn new(module: &'static str, total: usize) -> Self {
        let enabled = stdout().is_terminal() && total > 1;
        if enabled {
            let mut stdout = stdout().lock();
            writeln!(stdout).ok();
            stdout.flush().ok();
            BAR_ACTIVE.store(true, Ordering::SeqCst);
        }

        Self {
            prefix: colorize_prefix(module, &module.to_ascii_lowercase()),
            prefix_len: calc_prefix_len(module.len()),
            total,
            current: AtomicUsize::new(0),
            enabled,
            lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn inc(&self) {
        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        if self.enabled {
            self.display(current);
        }
    }

    fn display(&self, current: usize) {
        let _guard = self.lock.lock().ok();

        let width = get_terminal_width() as usize;
        let progress_text = format!("{}/{}", current, self.total);
        let overhead =
            self.prefix_len + BAR_WRAPPER_LEN + SPACE_BEFORE_COUNT + progress_text.len();
        let bar_width = width
            .saturating_sub(overhead)
            .clamp(MIN_BAR_WIDTH, MAX_BAR_WIDTH);
        let filled = filled_width(current, self.total, bar_width);
        let bar = "█".repeat(filled) + &"░".repeat(bar_width - filled);

        let mut stdout = stdout().lock();
        execute!(stdout, cursor::MoveUp(1)).ok();
        execute!(stdout, Clear(ClearType::CurrentLine)).ok();
        write!(stdout, "{} [{}] {}", self.prefix, bar, progress_text).ok();
        execute!(stdout, cursor::MoveDown(1)).ok();
        write!(stdout, "\r").ok();
        stdout.flush().ok();
    }

    /// Clear the bar line and hand the terminal back to `log`.
    pub fn finish(&self) {
        if !self.enabled || !BAR_ACTIVE.swap(false, Ordering::SeqCst) {
            return;
        }
        let _guard = self.lock.lock().ok();

        let mut stdout = stdout().lock();
        execute!(stdout, cursor::MoveUp(1)).ok();
        execute!(stdout, Clear(ClearType::CurrentLine)).ok();
        stdout.flush().ok();
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Number of filled cells for `current` out of `total`, capped at `width`.
#[inline]
const fn filled_width(current: usize, total: usize, width: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let filled = (current * width) / total;
    if filled > width { width } else { filled }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix.
///
/// Single-line messages are truncated to the terminal width.
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);
    let width = get_terminal_width() as usize;

    let mut stdout = stdout().lock();
    let bar_active = BAR_ACTIVE.load(Ordering::SeqCst);
    if bar_active {
        execute!(stdout, cursor::MoveUp(1)).ok();
        execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
    } else {
        execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    }

    if message.contains('\n') {
        writeln!(stdout, "{prefix} {message}").ok();
    } else {
        let max_msg_len = width.saturating_sub(calc_prefix_len(module.len()));
        writeln!(stdout, "{prefix} {}", truncate_str(message, max_msg_len)).ok();
    }

    if bar_active {
        writeln!(stdout).ok();
    }
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "check" | "html" | "source" => prefix.bright_blue().bold(),
        "convert" | "compress" | "publish" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Truncate to at most `max_len` bytes on a char boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ============================================================================
// Tests
// ============================================================================
