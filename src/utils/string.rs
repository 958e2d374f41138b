//! String utilities
//!
//! Character-boundary safe slicing for keys and response bodies.

/// Drop the first `count` characters of `s`.
///
/// Returns `None` when `s` has fewer than `count` characters.
///
/// # Example
/// ```
/// use consul_config_source::utils::skip_chars;
///
/// assert_eq!(skip_chars("testFacility/key.int", 13), Some("key.int"));
/// assert_eq!(skip_chars("key", 0), Some("key"));
/// assert_eq!(skip_chars("key", 4), None);
/// ```
pub fn skip_chars(s: &str, count: usize) -> Option<&str> {
    if count == 0 {
        return Some(s);
    }
    let mut indices = s.char_indices().skip(count);
    match indices.next() {
        Some((idx, _)) => Some(&s[idx..]),
        None if s.chars().count() == count => Some(""),
        None => None,
    }
}

/// Keep at most `max_chars` characters, appending `suffix` if anything was cut
///
/// # Example
/// ```
/// use consul_config_source::utils::truncate_with_suffix;
///
/// assert_eq!(truncate_with_suffix("Permission denied", 10, "..."), "Permission...");
/// assert_eq!(truncate_with_suffix("ok", 10, "..."), "ok");
/// ```
pub fn truncate_with_suffix(s: &str, max_chars: usize, suffix: &str) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &s[..idx], suffix),
        None => s.to_string(),
    }
}
