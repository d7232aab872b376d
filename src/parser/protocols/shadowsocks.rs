//! Shadowsocks protocol parser
//!
//! This module provides decoding for Shadowsocks (ss://) links in both the
//! explicit and the fully Base64-encoded layout.

use anyhow::{Context, Result, anyhow, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::config::outbound::{Outbound, ShadowsocksOutbound};
use crate::parser::base64::decode_base64_str;
use crate::parser::tag::extract_tag;

use super::{ProtocolParser, parse_port, tag_or_fallback};

/// `userinfo@host:port`, userinfo may itself be Base64.
static EXPLICIT_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)@(\[[^\]]+\]|[^:]+):(\d+)").expect("explicit ss pattern is valid")
});

/// Decoded legacy payload: `method:password@host:port`.
static DECODED_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^:]+):([^@]+)@(\[[^\]]+\]|[^:]+):(\d+)").expect("legacy ss pattern is valid")
});

// ============================================================================
// Shadowsocks Parser
// ============================================================================

/// Parser for Shadowsocks (ss://) links
///
/// Supported layouts:
/// - Explicit: ss://method:password@host:port#tag
/// - Explicit with Base64 userinfo: ss://BASE64(method:password)@host:port#tag
/// - Legacy: ss://BASE64(method:password@host:port)#tag
///
/// Query parameters (SIP003 plugins) are ignored.
pub struct ShadowsocksParser;

impl ProtocolParser for ShadowsocksParser {
    fn scheme(&self) -> &str {
        "ss"
    }

    fn parse(&self, uri: &str) -> Result<Outbound> {
        trace!("Parsing Shadowsocks link");
        let payload = uri
            .trim()
            .strip_prefix("ss://")
            .ok_or_else(|| anyhow!("Invalid Shadowsocks link: missing ss:// prefix"))?;

        let tag = extract_tag(payload);
        let body = strip_suffix_at(strip_suffix_at(payload, '#'), '?');

        let mut node = if body.contains('@') {
            trace!("Parsing explicit form");
            parse_explicit(body)?
        } else {
            trace!("Parsing Base64 form");
            parse_legacy(body)?
        };
        node.tag = tag_or_fallback(tag, "SS", &node.server, node.server_port);

        let outbound = Outbound::Shadowsocks(node);
        outbound.validate()?;
        Ok(outbound)
    }
}

fn strip_suffix_at(s: &str, marker: char) -> &str {
    s.split_once(marker).map_or(s, |(before, _)| before)
}

fn parse_explicit(body: &str) -> Result<ShadowsocksOutbound> {
    let caps = EXPLICIT_FORM
        .captures(body)
        .ok_or_else(|| anyhow!("Invalid Shadowsocks explicit form: {}", body))?;

    let (method, password) = parse_userinfo(&caps[1])?;
    Ok(ShadowsocksOutbound {
        server: unbracket(&caps[2]),
        server_port: parse_port(&caps[3])?,
        method,
        password,
        ..Default::default()
    })
}

fn parse_legacy(body: &str) -> Result<ShadowsocksOutbound> {
    let decoded = decode_base64_str(body).context("Failed to decode Shadowsocks Base64 payload")?;
    let caps = DECODED_FORM
        .captures(&decoded)
        .ok_or_else(|| anyhow!("Invalid Shadowsocks Base64 payload layout"))?;

    Ok(ShadowsocksOutbound {
        method: caps[1].to_string(),
        password: caps[2].to_string(),
        server: unbracket(&caps[3]),
        server_port: parse_port(&caps[4])?,
        ..Default::default()
    })
}

/// Splits `method:password`, which may be Base64-encoded.
///
/// The decoded form is only used when it contains a `:`; otherwise the
/// literal text is split. Userinfo is percent-decoded with `+` kept as is,
/// since Shadowsocks-2022 keys are standard Base64.
fn parse_userinfo(userinfo: &str) -> Result<(String, String)> {
    let auth = match decode_base64_str(userinfo) {
        Ok(decoded) if decoded.contains(':') => decoded,
        _ => urlencoding::decode(userinfo)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| userinfo.to_string()),
    };

    match auth.split_once(':') {
        Some((method, password)) => Ok((method.to_string(), password.to_string())),
        None => bail!("Invalid Shadowsocks userinfo: missing ':' between method and password"),
    }
}

fn unbracket(host: &str) -> String {
    host.trim_start_matches('[').trim_end_matches(']').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

    fn parse(uri: &str) -> ShadowsocksOutbound {
        match ShadowsocksParser.parse(uri).unwrap() {
            Outbound::Shadowsocks(ss) => ss,
            other => panic!("Expected Shadowsocks outbound, got {:?}", other),
        }
    }

    #[test]
    fn test_shadowsocks_explicit_plain() {
        let ss = parse("ss://aes-256-gcm:secret@1.2.3.4:8388#HK-01");
        assert_eq!(ss.tag, "HK-01");
        assert_eq!(ss.method, "aes-256-gcm");
        assert_eq!(ss.password, "secret");
        assert_eq!(ss.server, "1.2.3.4");
        assert_eq!(ss.server_port, 8388);
    }

    #[test]
    fn test_shadowsocks_explicit_base64_userinfo() {
        let userinfo = URL_SAFE_NO_PAD.encode("chacha20-ietf-poly1305:p@ss:word");
        let uri = format!("ss://{}@example.com:443#node", userinfo);
        let ss = parse(&uri);
        assert_eq!(ss.method, "chacha20-ietf-poly1305");
        assert_eq!(ss.password, "p@ss:word");
        assert_eq!(ss.server, "example.com");
        assert_eq!(ss.server_port, 443);
    }

    #[test]
    fn test_shadowsocks_2022_key_keeps_plus() {
        let key = "YctPZ6U7xPPcU+gp3u+0tx/tRizJN9K8y+uKlW2qjlI=";
        let ss = parse(&format!("ss://2022-blake3-aes-128-gcm:{}@1.2.3.4:443#n", key));
        assert_eq!(ss.method, "2022-blake3-aes-128-gcm");
        assert_eq!(ss.password, key);
        assert_eq!(ss.server_port, 443);
    }

    #[test]
    fn test_shadowsocks_percent_encoded_password() {
        let ss = parse("ss://aes-256-gcm:p%40ss%2Bw@1.2.3.4:8388");
        assert_eq!(ss.password, "p@ss+w");
    }

    #[test]
    fn test_shadowsocks_query_stripped() {
        let ss = parse("ss://aes-128-gcm:pw@example.com:8388/?plugin=obfs-local%3Bobfs%3Dhttp#x");
        assert_eq!(ss.server, "example.com");
        assert_eq!(ss.server_port, 8388);
        assert_eq!(ss.tag, "x");
    }

    #[test]
    fn test_shadowsocks_legacy_format() {
        let encoded = STANDARD.encode("aes-256-cfb:password@10.0.0.1:8080");
        let ss = parse(&format!("ss://{}#legacy", encoded));
        assert_eq!(ss.tag, "legacy");
        assert_eq!(ss.method, "aes-256-cfb");
        assert_eq!(ss.password, "password");
        assert_eq!(ss.server, "10.0.0.1");
        assert_eq!(ss.server_port, 8080);
    }

    #[test]
    fn test_shadowsocks_fallback_tag() {
        let ss = parse("ss://aes-128-gcm:pw@example.com:8388");
        assert_eq!(ss.tag, "SS-example.com:8388");
    }

    #[test]
    fn test_shadowsocks_ipv6_host() {
        let ss = parse("ss://aes-128-gcm:pw@[2001:db8::1]:8388#v6");
        assert_eq!(ss.server, "2001:db8::1");
        assert_eq!(ss.server_port, 8388);
    }

    #[test]
    fn test_shadowsocks_invalid_port() {
        assert!(ShadowsocksParser.parse("ss://aes-128-gcm:pw@example.com:99999").is_err());
        assert!(ShadowsocksParser.parse("ss://aes-128-gcm:pw@example.com:port").is_err());
    }

    #[test]
    fn test_shadowsocks_invalid_base64() {
        assert!(ShadowsocksParser.parse("ss://!!!notbase64!!!").is_err());
    }

    #[test]
    fn test_shadowsocks_missing_method() {
        assert!(ShadowsocksParser.parse("ss://:pw@example.com:8388").is_err());
    }

    #[test]
    fn test_shadowsocks_userinfo_without_colon() {
        assert!(ShadowsocksParser.parse("ss://justonefield@example.com:8388").is_err());
    }

    #[test]
    fn test_shadowsocks_wire_format() {
        let json = ShadowsocksParser
            .parse("ss://aes-128-gcm:pw@example.com:8388#t")
            .unwrap()
            .to_json()
            .unwrap();
        assert!(json.starts_with(r#"{"type":"shadowsocks","tag":"t""#));
    }
}
