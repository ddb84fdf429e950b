use std::path::{Path, PathBuf};

use unicode_segmentation::UnicodeSegmentation;

pub const MAX_NAME_LENGTH: usize = 80;
pub const UNNAMED: &str = "unnamed";

const RESERVED_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

#[must_use]
pub fn file_name_with_suffix(file_path: &Path, suffix: &str) -> PathBuf {
    let file_stem = match file_path.file_stem() {
        Some(x) => x,
        None => return file_path.to_path_buf(),
    };

    let mut file_name = file_stem.to_os_string();
    file_name.push(".");
    file_name.push(suffix);

    if let Some(ext) = file_path.extension() {
        file_name.push(".");
        file_name.push(ext);
    }

    file_path.with_file_name(file_name)
}

/// Make `raw` usable as a single path component.
///
/// Reserved characters become `_`, control characters are dropped, leading
/// and trailing dots and whitespace are stripped and the result is cut to
/// [`MAX_NAME_LENGTH`] graphemes. Returns `None` if nothing usable is left.
#[must_use]
pub fn sanitize_path_component(raw: &str) -> Option<String> {
    let replaced = raw
        .graphemes(true)
        .filter(|x| !x.chars().all(char::is_control))
        .map(|x| {
            if x.contains(RESERVED_CHARS) {
                "_"
            } else {
                x
            }
        })
        .collect::<String>();

    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());

    let truncated = trimmed
        .graphemes(true)
        .take(MAX_NAME_LENGTH)
        .collect::<String>();
    let truncated = truncated.trim_end_matches(|c: char| c == '.' || c.is_whitespace());

    if truncated.is_empty() {
        None
    } else {
        Some(truncated.to_string())
    }
}

/// Like [`sanitize_path_component`], falling back to [`UNNAMED`].
///
/// Spreadsheet blanks that were stringified as `nan` count as empty.
#[must_use]
pub fn sanitize_file_name(raw: &str) -> String {
    if raw.trim().eq_ignore_ascii_case("nan") {
        return UNNAMED.to_string();
    }

    sanitize_path_component(raw).unwrap_or_else(|| UNNAMED.to_string())
}
