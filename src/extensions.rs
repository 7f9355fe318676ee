//! Extension token handling.
//!
//! Free-text input such as `"jpg, PNG , .pdf"` is turned into a canonical set of
//! extension tokens (`.jpg`, `.png`, `.pdf`). Tokens are always lower-case and
//! dot-prefixed, which lets rule lookup be a plain set membership test.
//!
//! # Examples
//!
//! ```
//! use filesorter::extensions::parse_extensions;
//!
//! let exts = parse_extensions("jpg, PNG , .pdf");
//! assert!(exts.contains(".jpg"));
//! assert!(exts.contains(".png"));
//! assert!(exts.contains(".pdf"));
//! ```

use std::collections::BTreeSet;

/// Parses comma-separated extension text into a set of normalized tokens.
///
/// Each piece is trimmed and lower-cased; empty pieces are dropped and a
/// leading `.` is added when missing. Duplicates collapse silently. No length
/// or character validation is performed.
///
/// An empty or all-whitespace input yields an empty set, and an empty set
/// matches no file at all.
///
/// # Examples
///
/// ```
/// use filesorter::extensions::parse_extensions;
///
/// assert!(parse_extensions("  ,  ").is_empty());
/// assert_eq!(parse_extensions("JPG, jpg, .Jpg").len(), 1);
/// ```
pub fn parse_extensions(text: &str) -> BTreeSet<String> {
    text.split(',')
        .map(|piece| piece.trim().to_lowercase())
        .filter(|piece| !piece.is_empty())
        .map(dot_prefixed)
        .collect()
}

/// Normalizes a single extension for lookup: trimmed, lower-case and
/// dot-prefixed.
///
/// The empty string stays empty, so a file without an extension only matches
/// a rule that explicitly holds the empty token.
///
/// # Examples
///
/// ```
/// use filesorter::extensions::normalize_extension;
///
/// assert_eq!(normalize_extension("JPG"), ".jpg");
/// assert_eq!(normalize_extension(".Png"), ".png");
/// assert_eq!(normalize_extension(" GIF "), ".gif");
/// assert_eq!(normalize_extension(""), "");
/// ```
pub fn normalize_extension(ext: &str) -> String {
    let lowered = ext.trim().to_lowercase();
    if lowered.is_empty() {
        lowered
    } else {
        dot_prefixed(lowered)
    }
}

/// Formats a token set back into editable text.
///
/// Tokens are sorted, stripped of their leading dot and joined with `", "`.
/// A token that is only a dot, or starts with two, keeps its dots. Parsing
/// the result gives back the same set.
///
/// # Examples
///
/// ```
/// use filesorter::extensions::{format_extensions, parse_extensions};
///
/// let exts = parse_extensions("png, .JPG");
/// assert_eq!(format_extensions(&exts), "jpg, png");
/// assert_eq!(parse_extensions(&format_extensions(&exts)), exts);
/// ```
pub fn format_extensions(extensions: &BTreeSet<String>) -> String {
    extensions
        .iter()
        .map(|ext| match ext.strip_prefix('.') {
            Some(bare) if !bare.is_empty() && !bare.starts_with('.') => bare,
            _ => ext.as_str(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Splits a file name into stem and suffix.
///
/// The suffix runs from the last `.` to the end, dot included. Names whose
/// only dot is the first character (`.bashrc`) or whose last character is the
/// dot (`notes.`) have no suffix.
///
/// # Examples
///
/// ```
/// use filesorter::extensions::split_suffix;
///
/// assert_eq!(split_suffix("archive.tar.gz"), ("archive.tar", ".gz"));
/// assert_eq!(split_suffix("README"), ("README", ""));
/// assert_eq!(split_suffix(".bashrc"), (".bashrc", ""));
/// ```
pub fn split_suffix(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(index) if index > 0 && index < file_name.len() - 1 => file_name.split_at(index),
        _ => (file_name, ""),
    }
}

fn dot_prefixed(token: String) -> String {
    if token.starts_with('.') {
        token
    } else {
        format!(".{}", token)
    }
}
