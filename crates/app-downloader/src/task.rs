use std::fmt;

use app_helpers::{file_name::sanitize_file_name, id::url_id};
use serde::Serialize;
use url::Url;

/// Where a task came from in the input table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    /// Row as shown by a spreadsheet program, header being row 1.
    pub row: usize,
    /// Sheet or file the row was read from.
    pub group: String,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {}", self.group, self.row)
    }
}

/// One URL to fetch, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    id: usize,
    url: String,
    display_name: String,
    classification_key: Option<String>,
    origin: Option<Origin>,
}

impl DownloadTask {
    /// The display name is sanitized for use in file names.
    pub fn new<T>(id: usize, url: T, display_name: &str) -> Self
    where
        T: Into<String>,
    {
        let url: String = url.into();

        Self {
            id,
            url: url.trim().to_string(),
            display_name: sanitize_file_name(display_name),
            classification_key: None,
            origin: None,
        }
    }

    #[must_use]
    pub fn with_classification_key(mut self, key: Option<String>) -> Self {
        self.classification_key = key
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty());
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn classification_key(&self) -> Option<&str> {
        self.classification_key.as_deref()
    }

    #[must_use]
    pub const fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// Stable id of the URL, used as the file name prefix.
    #[must_use]
    pub fn url_id(&self) -> String {
        url_id(&self.url)
    }

    #[must_use]
    pub fn has_valid_url(&self) -> bool {
        is_valid_url(&self.url)
    }
}

/// Cheap check used when reading rows: does the value look like a web link at all.
#[must_use]
pub fn has_http_prefix(raw: &str) -> bool {
    let raw = raw.trim_start().as_bytes();

    ["http://", "https://"].iter().any(|prefix| {
        raw.len() >= prefix.len() && raw[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    })
}

/// A URL the executor is willing to request.
#[must_use]
pub fn is_valid_url(raw: &str) -> bool {
    if !has_http_prefix(raw) {
        return false;
    }

    Url::parse(raw.trim()).is_ok_and(|x| {
        matches!(x.scheme(), "http" | "https") && x.host_str().is_some_and(|h| !h.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sanitized() {
        let task = DownloadTask::new(0, " https://example.com/a.jpg ", "summer/sale: 1");

        assert_eq!(task.url(), "https://example.com/a.jpg");
        assert_eq!(task.display_name(), "summer_sale_ 1");

        let task = DownloadTask::new(1, "https://example.com/a.jpg", "nan");
        assert_eq!(task.display_name(), "unnamed");
    }

    #[test]
    fn blank_keys_are_dropped() {
        let task = DownloadTask::new(0, "https://example.com", "x")
            .with_classification_key(Some("   ".to_string()));
        assert_eq!(task.classification_key(), None);

        let task = DownloadTask::new(0, "https://example.com", "x")
            .with_classification_key(Some(" promo ".to_string()));
        assert_eq!(task.classification_key(), Some("promo"));
    }

    #[test]
    fn url_validity() {
        assert!(is_valid_url("https://example.com/video.mp4"));
        assert!(is_valid_url("HTTP://EXAMPLE.COM/x"));
        assert!(!is_valid_url("not-a-url"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("ftp://example.com/file"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("javascript:alert(1)"));
    }

    #[test]
    fn same_url_same_id() {
        let a = DownloadTask::new(0, "https://example.com/a", "a");
        let b = DownloadTask::new(7, "https://example.com/a", "b");
        let c = DownloadTask::new(0, "https://example.com/c", "a");

        assert_eq!(a.url_id(), b.url_id());
        assert_ne!(a.url_id(), c.url_id());
    }
}
