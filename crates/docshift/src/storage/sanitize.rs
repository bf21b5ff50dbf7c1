//! Filename sanitization for response headers and derived artifact names.
//!
//! Text is first NFKC-normalized so compatibility forms collapse onto their
//! portable equivalents (full-width `Ｒ` becomes `R`, the `ﬁ` ligature becomes
//! `fi`). Every character that is still outside `[A-Za-z0-9._-]` is replaced
//! with `_`, one underscore per character, so `é` in a name shows up as `_`.

use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Returned when there is nothing left to name.
pub const PLACEHOLDER_NAME: &str = "file";

/// Convert arbitrary text into a header-safe identifier.
///
/// Deterministic and total: never fails and never returns an empty string.
///
/// ```rust
/// use docshift::storage::sanitize;
///
/// assert_eq!(sanitize("résumé 2024.pdf"), "r_sum__2024.pdf");
/// assert_eq!(sanitize(""), "file");
/// ```
pub fn sanitize(text: &str) -> String {
    let sanitized: String = text
        .nfkc()
        .map(|ch| if is_portable(ch) { ch } else { '_' })
        .collect();

    if sanitized.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        sanitized
    }
}

/// Sanitized stem of an uploaded filename, used to name derived artifacts.
///
/// Any directory components a client smuggles into the name are dropped.
pub fn safe_stem(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = Path::new(base)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    sanitize(&stem)
}

/// Lowercased extension of an uploaded filename, without the dot.
pub fn lowercase_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

fn is_portable(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-')
}
