use url::Url;

/// How many leading bytes of a payload are kept for sniffing.
pub const SNIFF_LEN: usize = 64;

pub const FALLBACK_EXTENSION: &str = ".bin";

const MAX_URL_EXTENSION_LEN: usize = 8;

const MARKUP_PREFIXES: [&[u8]; 6] = [b"<html", b"<!doctype", b"<body", b"<?xml", b"{", b"["];

/// Does the start of a payload look like a web page or JSON document?
///
/// Expired signed links usually answer `200 OK` with an error page.
#[must_use]
pub fn looks_like_markup(head: &[u8]) -> bool {
    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    let start = head
        .iter()
        .position(|x| !x.is_ascii_whitespace())
        .unwrap_or(head.len());
    let head = &head[start..];

    MARKUP_PREFIXES
        .iter()
        .any(|prefix| head.len() >= prefix.len() && head[..prefix.len()].eq_ignore_ascii_case(prefix))
}

/// File extension (with the leading dot) for a downloaded payload.
///
/// The response content type wins, then the extension in the URL path,
/// then [`FALLBACK_EXTENSION`].
#[must_use]
pub fn detect_extension(content_type: Option<&str>, url: &str) -> String {
    content_type
        .and_then(extension_from_content_type)
        .or_else(|| extension_from_url(url))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

fn extension_from_content_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim().to_lowercase();

    if essence.is_empty() || essence == "application/octet-stream" {
        return None;
    }

    mime2ext::mime2ext(&essence)
        .map(|x| format!(".{x}"))
        .filter(|x| x != FALLBACK_EXTENSION)
}

fn extension_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let last = url.path_segments()?.last()?;
    let (stem, ext) = last.rsplit_once('.')?;

    let valid = !stem.is_empty()
        && !ext.is_empty()
        && ext.len() <= MAX_URL_EXTENSION_LEN
        && ext.chars().all(|x| x.is_ascii_alphanumeric());

    valid.then(|| format!(".{}", ext.to_ascii_lowercase()))
}
