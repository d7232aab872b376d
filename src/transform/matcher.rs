//! Tag pattern matching for group filters.
//!
//! A pattern containing any regex metacharacter is treated as a regular
//! expression; anything else is a plain substring. A pattern that looks
//! like a regex but does not compile falls back to substring matching, so
//! matching never fails.

use regex::Regex;
use tracing::trace;

/// Characters that mark a pattern as a regular expression.
const REGEX_CHARS: [char; 13] = [
    '^', '$', '*', '+', '?', '.', '[', ']', '(', ')', '{', '}', '\\',
];

/// Returns `true` if `pattern` should be evaluated as a regex.
pub fn is_regex_pattern(pattern: &str) -> bool {
    pattern.contains(&REGEX_CHARS[..])
}

/// Checks whether `tag` matches a single pattern.
pub fn matches(tag: &str, pattern: &str) -> bool {
    if !is_regex_pattern(pattern) {
        return tag.contains(pattern);
    }

    match Regex::new(pattern) {
        Ok(re) => re.is_match(tag),
        Err(e) => {
            trace!(pattern, error = %e, "invalid regex pattern, using substring match");
            tag.contains(pattern)
        }
    }
}

/// Checks whether `tag` matches any alternative of any pattern.
///
/// Each pattern is split on `|` before matching, so `"HK|JP"` matches tags
/// containing either `HK` or `JP`.
pub fn matches_any<S: AsRef<str>>(tag: &str, patterns: &[S]) -> bool {
    patterns
        .iter()
        .flat_map(|pattern| pattern.as_ref().split('|'))
        .any(|alternative| matches(tag, alternative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_regex_pattern() {
        assert!(is_regex_pattern("^HK"));
        assert!(is_regex_pattern("a.b"));
        assert!(is_regex_pattern(r"\d+"));
        assert!(!is_regex_pattern("HK"));
        assert!(!is_regex_pattern("香港"));
    }

    #[test]
    fn test_literal_substring() {
        assert!(matches("ProxyNode-HK", "HK"));
        assert!(!matches("ProxyNode-HK", "JP"));
    }

    #[test]
    fn test_regex_match() {
        assert!(matches("ProxyNode-HK", "^Proxy.*"));
        assert!(matches("HK-01", r"^HK-\d+$"));
        assert!(!matches("JP-01", "^HK"));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_substring() {
        assert!(!matches("ProxyNode-HK", "[invalid"));
        assert!(matches("node [invalid", "[invalid"));
    }

    #[test]
    fn test_matches_any_splits_alternatives() {
        assert!(matches_any("日本 01", &["HK|日本"]));
        assert!(matches_any("US-02", &["HK", "^US"]));
        assert!(!matches_any("SG-01", &["HK|JP", "US"]));
    }

    #[test]
    fn test_matches_any_empty_patterns() {
        let none: [&str; 0] = [];
        assert!(!matches_any("HK", &none));
    }

    #[test]
    fn test_alternation_inside_group_is_split_first() {
        // "(HK" and "JP)" are both invalid regexes, so both fall back to substring
        assert!(!matches_any("HK-01", &["(HK|JP)"]));
        assert!(matches_any("(HK-01", &["(HK|JP)"]));
    }
}
