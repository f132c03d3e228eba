//! URL and hashtag extraction from free-form chat text.
//!
//! All functions are pure and total: malformed input yields empty results,
//! never an error.

use once_cell::sync::Lazy;
use regex::Regex;

/// Web URLs with an explicit `http`/`https` scheme. Only the scheme and `www.`
/// prefix are case-insensitive, and only over ASCII. The word boundary after the
/// top-level domain is ASCII-only so Thai text directly after a domain still
/// terminates the match.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i-u:https?://(www\.)?)[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}(?-u:\b)[-a-zA-Z0-9()@:%_+.~#?&/=]*",
    )
    .expect("URL pattern is a valid regex")
});

/// `#` followed by ASCII word characters or Thai script (U+0E01..U+0E59).
static HASHTAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#[A-Za-z0-9_\x{0E01}-\x{0E59}]+").expect("hashtag pattern is a valid regex")
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is a valid regex"));

/// Find every URL in `text`, left to right, without overlap.
///
/// ```
/// use brain_core::extract::extract_urls;
///
/// let urls = extract_urls("see https://example.com/a?b=1 and http://rust-lang.org");
/// assert_eq!(urls, vec!["https://example.com/a?b=1", "http://rust-lang.org"]);
/// ```
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Find every hashtag in `text` with the leading `#` removed.
///
/// Duplicates are kept in order of appearance; callers that store tags
/// deduplicate with [`merge_tags`].
pub fn extract_hashtags(text: &str) -> Vec<String> {
    HASHTAG_PATTERN
        .find_iter(text)
        .map(|m| m.as_str()[1..].to_string())
        .collect()
}

/// True when `text` parses as an absolute `http` or `https` URL.
pub fn is_valid_url(text: &str) -> bool {
    match url::Url::parse(text) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Collapse runs of whitespace into a single space and trim the ends.
pub fn normalize_content(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Set union of two tag lists, preserving first-occurrence order.
///
/// Comparison is exact (case-sensitive); `a` entries come before new entries
/// from `b`.
pub fn merge_tags<A, B>(a: A, b: B) -> Vec<String>
where
    A: IntoIterator,
    A::Item: Into<String>,
    B: IntoIterator,
    B::Item: Into<String>,
{
    let mut merged: Vec<String> = Vec::new();
    for tag in a.into_iter().map(Into::into).chain(b.into_iter().map(Into::into)) {
        if !merged.contains(&tag) {
            merged.push(tag);
        }
    }
    merged
}

/// Remove URLs and hashtags from `text`, leaving the surrounding prose.
pub(crate) fn strip_urls_and_hashtags(text: &str) -> String {
    let without_tags = HASHTAG_PATTERN.replace_all(text, "");
    URL_PATTERN.replace_all(&without_tags, "").into_owned()
}
