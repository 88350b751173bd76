//! Plain-text helpers for titles and summaries.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Summary length bound, in characters.
pub const SUMMARY_MAX_CHARS: usize = 300;

/// Strip HTML to plain text, bounded to `max_chars` characters.
///
/// Entities are decoded first so that escaped markup (`&lt;b&gt;`) is also
/// removed; tags become a space, whitespace runs collapse to one space.
pub fn strip_html(s: &str, max_chars: usize) -> String {
    if s.is_empty() {
        return String::new();
    }

    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(s);

    // 2) Tags -> space
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("tag regex"));
    let untagged = re_tags.replace_all(&decoded, " ");

    // 3) Collapse whitespace (split_whitespace also folds U+00A0)
    let collapsed = untagged.split_whitespace().collect::<Vec<_>>().join(" ");

    // 4) Length cap
    truncate_chars(&collapsed, max_chars)
}

/// Keep at most `max` chars; never splits a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Collapse whitespace in a title without touching its length.
pub fn clean_title(s: &str) -> String {
    html_escape::decode_html_entities(s)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
