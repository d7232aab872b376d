//! Base64 decoding utilities
//!
//! Share links embed base64 in several places (SS userinfo, the whole SSR
//! payload, SSR parameters) and rarely agree on alphabet or padding. The
//! helpers here try the variants in a fixed order so decoding is
//! deterministic.

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use tracing::trace;

// ============================================================================
// Base64 Decoding
// ============================================================================

/// Decodes Base64 content, trying multiple variants
///
/// Attempts to decode the content using:
/// 1. Standard Base64
/// 2. URL-safe Base64
/// 3. URL-safe Base64 without padding
/// 4. Standard/URL-safe with padding added
///
/// Whitespace in the input is removed before decoding.
pub fn decode_base64(content: &str) -> Result<Vec<u8>> {
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    trace!("Attempting Base64 decode, cleaned length: {} bytes", cleaned.len());

    if let Ok(decoded) = STANDARD.decode(&cleaned) {
        return Ok(decoded);
    }
    if let Ok(decoded) = URL_SAFE.decode(&cleaned) {
        return Ok(decoded);
    }
    if let Ok(decoded) = URL_SAFE_NO_PAD.decode(&cleaned) {
        return Ok(decoded);
    }

    let padded = add_base64_padding(&cleaned);
    if let Ok(decoded) = STANDARD.decode(&padded) {
        trace!("Decoded using standard Base64 with added padding");
        return Ok(decoded);
    }
    if let Ok(decoded) = URL_SAFE.decode(&padded) {
        trace!("Decoded using URL-safe Base64 with added padding");
        return Ok(decoded);
    }

    bail!("Failed to decode Base64 content")
}

/// Like [`decode_base64`], but the result must be UTF-8 text.
pub fn decode_base64_str(content: &str) -> Result<String> {
    let decoded = decode_base64(content)?;
    String::from_utf8(decoded).context("Decoded Base64 content is not valid UTF-8")
}

/// Decodes SSR-style Base64: URL-safe alphabet first, then standard.
///
/// Missing padding is added before either attempt. SSR links are produced
/// by tools that emit the URL-safe alphabet, so it wins when both would
/// accept the input.
pub fn decode_base64_url_first(content: &str) -> Result<String> {
    let padded = add_base64_padding(content);
    let decoded = URL_SAFE
        .decode(&padded)
        .or_else(|_| STANDARD.decode(&padded))
        .context("Failed to decode URL-safe or standard Base64")?;
    String::from_utf8(decoded).context("Decoded Base64 content is not valid UTF-8")
}

/// Adds proper padding to Base64 string if missing
///
/// Base64 strings should have a length that is a multiple of 4.
pub fn add_base64_padding(s: &str) -> String {
    let mut result = s.to_string();
    while !result.len().is_multiple_of(4) {
        result.push('=');
    }
    result
}
