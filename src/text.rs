//! String-level helpers applied at the text-extraction boundary.

use std::sync::LazyLock;

use regex::Regex;

static INT_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").unwrap());
static DECIMAL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+(?:\.\d*)?(?:[eE][+-]?\d+)?)").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Undo the right-to-left capture order of Hebrew captions.
///
/// The site emits region captions in visual order, so the characters arrive
/// reversed relative to logical order. This is an upstream encoding
/// workaround and applies only to captions, not to general cell text.
pub fn fix_directional_text(captured: &str) -> String {
    captured.chars().rev().collect()
}

/// True when the text starts with an integer, ignoring leading whitespace.
/// `"12.7mg"` passes, `""`, `"N/A"` and `".5"` do not.
pub fn has_integer_prefix(text: &str) -> bool {
    INT_PREFIX_RE.is_match(text)
}

/// Leading integer of the text, e.g. `30` for `"30 Minutes"`.
pub fn integer_prefix(text: &str) -> Option<i64> {
    INT_PREFIX_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Longest leading decimal number, e.g. `12.7` for `"12.7mg"`.
pub fn decimal_prefix(text: &str) -> Option<f64> {
    DECIMAL_PREFIX_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// First space-separated token of trimmed text, `""` when there is none.
pub fn leading_token(text: &str) -> &str {
    text.trim().split(' ').next().unwrap_or("")
}

/// Trim and collapse internal whitespace runs to a single space.
pub fn squash_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}
