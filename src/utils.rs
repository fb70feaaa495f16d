//! Small text and filesystem helpers shared across the crate.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, instrument};

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last char boundary at or below `max` bytes
/// and get `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Keep at most `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    RE_WS.replace_all(s, " ").trim().to_string()
}

/// Whitespace-normalize multi-line text: each line collapsed and trimmed,
/// blank lines dropped, the rest joined with `\n`.
pub fn normalize_lines(s: &str) -> String {
    s.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `true` when the string has no non-whitespace characters.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn ensure_writable_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)?;
    let probe_path = path.join("..__probe_write__");
    fs::File::create(&probe_path)?;
    let _ = fs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
