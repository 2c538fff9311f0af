//! Filename and folder-name sanitization plus extension helpers.
//!
//! Folder names are derived from post titles, which arrive with arbitrary
//! Unicode, emoji, and characters that are invalid on common filesystems.
//! [`sanitize_name`] turns any string into a safe, idempotent path
//! component; [`extension_from_api_path`] recovers the original file
//! extension from an API-relative media path.

use std::path::Path;

use deunicode::deunicode;

/// Fallback returned when sanitization leaves nothing usable.
pub const UNTITLED: &str = "untitled";

/// Fallback extension for media paths that carry none.
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Sanitizes a string into a safe filename or directory component.
///
/// - Transliterates Unicode (accents, emoji, CJK) to an ASCII approximation
/// - Removes characters invalid on common filesystems (`\/:*?"<>|`) and
///   control characters (0-31, 127)
/// - Collapses whitespace runs into a single `_`
/// - Trims leading/trailing dots, spaces, and `_`
/// - Returns `"untitled"` when the result is empty or all dots
///
/// Idempotent: `sanitize_name(sanitize_name(x)) == sanitize_name(x)`.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let ascii = deunicode(name);

    let mut out = String::with_capacity(ascii.len());
    let mut prev_sep = false;
    for ch in ascii.chars() {
        match ch {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => {}
            c if c.is_control() => {}
            c if c.is_whitespace() => {
                if !prev_sep {
                    out.push('_');
                    prev_sep = true;
                }
            }
            c => {
                out.push(c);
                prev_sep = false;
            }
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == ' ' || c == '_');

    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return UNTITLED.to_string();
    }

    trimmed.to_string()
}

/// Extracts the extension (with leading dot, lowercased) from an
/// API-relative media path, falling back to [`DEFAULT_EXTENSION`].
#[must_use]
pub fn extension_from_api_path(api_path: &str) -> String {
    Path::new(api_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 12)
        .map_or_else(
            || DEFAULT_EXTENSION.to_string(),
            |ext| format!(".{}", ext.to_lowercase()),
        )
}

/// Zero-padding width for sequential filenames in a group: wide enough for
/// the largest sequence number, never narrower than four digits.
#[must_use]
pub fn padding_width(item_count: usize) -> usize {
    item_count.to_string().len().max(4)
}
