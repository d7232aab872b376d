//! Protocol parsers module
//!
//! This module contains decoders for the supported share-link formats.
//! Each decoder implements the `ProtocolParser` trait and is registered
//! once in a `ProtocolRegistry`, which dispatches raw links by scheme.

mod anytls;
mod hysteria2;
mod shadowsocks;
mod shadowsocksr;
mod trojan;
mod vless;

pub use anytls::AnyTlsParser;
pub use hysteria2::Hysteria2Parser;
pub use shadowsocks::ShadowsocksParser;
pub use shadowsocksr::ShadowsocksRParser;
pub use trojan::TrojanParser;
pub use vless::VLessParser;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;
use url::{Host, Url};

use crate::config::outbound::Outbound;

// ============================================================================
// Protocol Parser Trait
// ============================================================================

/// Trait for decoding individual share links
pub trait ProtocolParser: Send + Sync {
    /// Returns the scheme this parser handles (e.g., "ss", "vless")
    fn scheme(&self) -> &str;

    /// Decodes a raw link into a validated outbound node
    fn parse(&self, uri: &str) -> Result<Outbound>;

    /// Checks if this parser can handle the given link
    fn can_parse(&self, uri: &str) -> bool {
        uri.starts_with(&format!("{}://", self.scheme()))
    }
}

// ============================================================================
// Protocol Registry
// ============================================================================

/// Scheme-to-decoder dispatch table.
///
/// Built once with [`ProtocolRegistry::with_builtin_parsers`] and shared
/// read-only afterwards (wrap it in an `Arc` to hand it to tasks).
pub struct ProtocolRegistry {
    parsers: HashMap<String, Arc<dyn ProtocolParser>>,
}

impl ProtocolRegistry {
    fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Creates a registry with all built-in decoders registered
    pub fn with_builtin_parsers() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ShadowsocksParser));
        registry.register(Arc::new(ShadowsocksRParser));
        registry.register(Arc::new(TrojanParser));
        registry.register(Arc::new(Hysteria2Parser::new("hysteria2")));
        registry.register(Arc::new(Hysteria2Parser::new("hy2")));
        registry.register(Arc::new(AnyTlsParser));
        registry.register(Arc::new(VLessParser));
        debug!(schemes = ?registry.schemes(), "protocol registry ready");
        registry
    }

    fn register(&mut self, parser: Arc<dyn ProtocolParser>) {
        self.parsers.insert(parser.scheme().to_string(), parser);
    }

    /// Gets the decoder for the given scheme
    pub fn get(&self, scheme: &str) -> Option<&Arc<dyn ProtocolParser>> {
        self.parsers.get(scheme)
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Decodes a link using the decoder registered for its scheme
    pub fn parse_uri(&self, uri: &str) -> Result<Outbound> {
        let scheme = extract_scheme(uri);
        let parser = self
            .parsers
            .get(scheme)
            .ok_or_else(|| anyhow!("unsupported protocol: {}", scheme))?;

        let result = parser.parse(uri);
        match &result {
            Ok(outbound) => {
                debug!("Decoded {} link -> outbound '{}'", scheme, outbound.tag());
            }
            Err(e) => {
                debug!("Failed to decode {} link: {:#}", scheme, e);
            }
        }
        result
    }

    /// Decodes a link and serializes the node to its JSON wire format
    pub fn parse_uri_to_json(&self, uri: &str) -> Result<String> {
        let outbound = self.parse_uri(uri)?;
        outbound
            .to_json()
            .with_context(|| format!("Failed to serialize outbound '{}'", outbound.tag()))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Splits a link list into trimmed links.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn split_link_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Extracts the scheme from a link: everything before the first `://`.
///
/// Returns an empty string when there is no separator or nothing precedes
/// it.
pub fn extract_scheme(uri: &str) -> &str {
    match uri.find("://") {
        Some(index) if index > 0 => &uri[..index],
        _ => "",
    }
}

/// Strips the fragment and parses the remainder as a URL.
///
/// Fragments hold free-form labels that may not survive URL parsing; the
/// label is extracted separately from the raw link.
pub(crate) fn parse_link_url(uri: &str, protocol: &str) -> Result<Url> {
    let without_fragment = uri.split_once('#').map_or(uri, |(before, _)| before);
    Url::parse(without_fragment).with_context(|| format!("Failed to parse {} URL", protocol))
}

/// Host of a parsed link with IPv6 brackets removed.
pub(crate) fn url_host(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) if domain.is_empty() => None,
        Host::Domain(domain) => Some(domain.to_string()),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

/// Percent-decoded username of a parsed link.
pub(crate) fn url_username(url: &Url) -> String {
    urlencoding::decode(url.username())
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| url.username().to_string())
}

/// Query parameters of a parsed link; the first occurrence of a key wins.
pub(crate) fn query_params(url: &Url) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in url.query_pairs() {
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    params
}

/// Non-empty query value for `key`.
pub(crate) fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// Whether a boolean-ish link flag is set (`1` or case-insensitive `true`).
pub(crate) fn is_flag_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Parses a decimal port, rejecting 0 and values above 65535.
pub(crate) fn parse_port(port: &str) -> Result<u16> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => bail!("Invalid port number: {}", port),
        Ok(port) => Ok(port),
    }
}

/// Label used when a link carries none: `<PREFIX>-<host>:<port>`.
pub(crate) fn fallback_tag(prefix: &str, server: &str, port: u16) -> String {
    format!("{}-{}:{}", prefix, server, port)
}

/// Picks the extracted label, or synthesizes one.
pub(crate) fn tag_or_fallback(tag: String, prefix: &str, server: &str, port: u16) -> String {
    if tag.is_empty() {
        fallback_tag(prefix, server, port)
    } else {
        tag
    }
}
