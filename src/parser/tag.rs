//! Display-label extraction for share links.
//!
//! A link carries its label either in the URL fragment (`#name`) or in a
//! `?remarks=` query value. Labels are percent-decoded, stripped of
//! four-byte UTF-8 characters (emoji and other supplementary-plane
//! symbols) and trimmed.

const REMARKS_KEY: &str = "?remarks=";

/// Extracts the display label embedded in a raw link.
///
/// Returns an empty string when the link carries no usable label; callers
/// then synthesize their own fallback.
pub fn extract_tag(raw: &str) -> String {
    let mut rest = raw;

    if let Some((before, fragment)) = raw.split_once('#') {
        if let Some(tag) = query_unescape(fragment)
            && !tag.is_empty()
        {
            return sanitize_tag(&tag);
        }
        rest = before;
    }

    if let Some(index) = rest.find(REMARKS_KEY) {
        let value = &rest[index + REMARKS_KEY.len()..];
        if let Some(tag) = query_unescape(value)
            && !tag.is_empty()
        {
            return sanitize_tag(&tag);
        }
    }

    String::new()
}

/// Removes emoji and trims surrounding whitespace.
pub fn sanitize_tag(tag: &str) -> String {
    remove_emoji(tag).trim().to_string()
}

/// Drops every character whose UTF-8 encoding is four bytes long.
pub fn remove_emoji(s: &str) -> String {
    s.chars().filter(|c| c.len_utf8() != 4).collect()
}

/// Percent-decodes a query component, treating `+` as a space.
///
/// Returns `None` when an escape is malformed or the decoded bytes are not
/// UTF-8.
pub fn query_unescape(s: &str) -> Option<String> {
    if !has_valid_escapes(s) {
        return None;
    }
    let spaced = s.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|c| c.into_owned())
}

/// Every `%` must be followed by two hex digits.
fn has_valid_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_tag() {
        assert_eq!(extract_tag("ss://abc@host:1#HK-01"), "HK-01");
    }

    #[test]
    fn test_fragment_percent_decoded() {
        assert_eq!(
            extract_tag("trojan://pw@host:443#%E9%A6%99%E6%B8%AF%2001"),
            "香港 01"
        );
    }

    #[test]
    fn test_fragment_strips_emoji_and_whitespace() {
        assert_eq!(extract_tag("ss://x#%F0%9F%87%AD%F0%9F%87%B0%20HK"), "HK");
        assert_eq!(extract_tag("ss://x#🇯🇵 Tokyo "), "Tokyo");
    }

    #[test]
    fn test_plus_is_space() {
        assert_eq!(extract_tag("ss://x#Hong+Kong"), "Hong Kong");
    }

    #[test]
    fn test_remarks_fallback() {
        assert_eq!(extract_tag("ssr://payload?remarks=JP%201"), "JP 1");
    }

    #[test]
    fn test_empty_fragment_falls_through_to_remarks() {
        assert_eq!(extract_tag("ssr://payload?remarks=US#"), "US");
    }

    #[test]
    fn test_invalid_utf8_fragment_falls_through() {
        assert_eq!(extract_tag("ss://x?remarks=ok#%FF"), "ok");
        assert_eq!(extract_tag("ss://x#%FF"), "");
    }

    #[test]
    fn test_malformed_escape_falls_through() {
        assert_eq!(extract_tag("trojan://pw@h:443#%zz"), "");
        assert_eq!(extract_tag("trojan://pw@h:443#100%"), "");
        assert_eq!(extract_tag("ssr://payload?remarks=JP#%4"), "JP");
    }

    #[test]
    fn test_query_unescape_escapes() {
        assert_eq!(query_unescape("a%2Bb+c").as_deref(), Some("a+b c"));
        assert_eq!(query_unescape("%e9%a6%99").as_deref(), Some("香"));
        assert!(query_unescape("%g0").is_none());
        assert!(query_unescape("50%").is_none());
    }

    #[test]
    fn test_no_tag() {
        assert_eq!(extract_tag("ss://abc@host:1"), "");
        assert_eq!(extract_tag("ss://abc@host:1?plugin=x"), "");
    }

    #[test]
    fn test_emoji_only_tag_is_empty() {
        assert_eq!(extract_tag("ss://x#🚀"), "");
    }

    #[test]
    fn test_remove_emoji_keeps_three_byte_chars() {
        assert_eq!(remove_emoji("香港🚀节点"), "香港节点");
        assert_eq!(remove_emoji("plain"), "plain");
    }
}
