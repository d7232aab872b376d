//! Hysteria2 protocol parser
//!
//! This module provides decoding for Hysteria2 (hysteria2:// or hy2://) links.
//! Format: hysteria2://auth@host:port?params#tag

use anyhow::{Result, anyhow};
use tracing::trace;

use crate::config::outbound::{Hysteria2Obfs, Hysteria2Outbound, Outbound};
use crate::config::shared::{DialFields, OutboundTlsConfig};
use crate::parser::tag::extract_tag;

use super::{
    ProtocolParser, is_flag_set, non_empty, parse_link_url, query_params, tag_or_fallback,
    url_host, url_username,
};

const DEFAULT_PORT: u16 = 443;
const DEFAULT_UP_MBPS: u32 = 100;
const DEFAULT_DOWN_MBPS: u32 = 500;
const DEFAULT_ALPN: &str = "h3";
/// Upstream selector every Hysteria2 node is chained through.
const DEFAULT_DETOUR: &str = "Select";

// ============================================================================
// Hysteria2 Parser
// ============================================================================

/// Parser for Hysteria2 (hysteria2:// or hy2://) links
///
/// Format: hysteria2://auth@host:port?params#tag
pub struct Hysteria2Parser {
    scheme: &'static str,
}

impl Hysteria2Parser {
    pub fn new(scheme: &'static str) -> Self {
        Self { scheme }
    }
}

impl ProtocolParser for Hysteria2Parser {
    fn scheme(&self) -> &str {
        self.scheme
    }

    fn parse(&self, uri: &str) -> Result<Outbound> {
        trace!("Parsing Hysteria2 link (scheme: {})", self.scheme);
        let tag = extract_tag(uri);
        let url = parse_link_url(uri, "Hysteria2")?;

        let server = url_host(&url).ok_or_else(|| anyhow!("Hysteria2 link missing host"))?;
        let server_port = url.port().unwrap_or(DEFAULT_PORT);
        let password = url_username(&url);

        let params = query_params(&url);

        let tls = OutboundTlsConfig {
            enabled: true,
            server_name: non_empty(&params, "sni").map(str::to_string),
            insecure: is_flag_set(params.get("insecure").map(String::as_str)),
            alpn: vec![
                non_empty(&params, "alpn")
                    .unwrap_or(DEFAULT_ALPN)
                    .to_string(),
            ],
            ..Default::default()
        };

        let obfs = non_empty(&params, "obfs").map(|obfs_type| Hysteria2Obfs {
            obfs_type: Some(obfs_type.to_string()),
            password: params.get("obfs-password").cloned(),
        });

        let outbound = Outbound::Hysteria2(Hysteria2Outbound {
            tag: tag_or_fallback(tag, "HY2", &server, server_port),
            server,
            server_port,
            password: (!password.is_empty()).then_some(password),
            up_mbps: DEFAULT_UP_MBPS,
            down_mbps: DEFAULT_DOWN_MBPS,
            obfs,
            tls,
            dial: DialFields {
                detour: Some(DEFAULT_DETOUR.to_string()),
            },
        });
        outbound.validate()?;
        Ok(outbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(uri: &str) -> Hysteria2Outbound {
        match Hysteria2Parser::new("hysteria2").parse(uri).unwrap() {
            Outbound::Hysteria2(hy2) => hy2,
            other => panic!("Expected Hysteria2 outbound, got {:?}", other),
        }
    }

    #[test]
    fn test_hysteria2_defaults() {
        let hy2 = parse("hysteria2://auth@example.com:8443#node");
        assert_eq!(hy2.tag, "node");
        assert_eq!(hy2.server, "example.com");
        assert_eq!(hy2.server_port, 8443);
        assert_eq!(hy2.password.as_deref(), Some("auth"));
        assert_eq!(hy2.up_mbps, 100);
        assert_eq!(hy2.down_mbps, 500);
        assert!(hy2.tls.enabled);
        assert_eq!(hy2.tls.alpn, vec!["h3"]);
        assert!(hy2.tls.server_name.is_none());
        assert_eq!(hy2.dial.detour.as_deref(), Some("Select"));
        assert!(hy2.obfs.is_none());
    }

    #[test]
    fn test_hysteria2_default_port_and_tag() {
        let hy2 = parse("hysteria2://auth@example.com");
        assert_eq!(hy2.server_port, 443);
        assert_eq!(hy2.tag, "HY2-example.com:443");
    }

    #[test]
    fn test_hysteria2_query_overrides() {
        let hy2 = parse(
            "hysteria2://auth@example.com:443/?sni=real.example.com&alpn=h3-29&obfs=salamander&obfs-password=cry",
        );
        assert_eq!(hy2.tls.server_name.as_deref(), Some("real.example.com"));
        assert_eq!(hy2.tls.alpn, vec!["h3-29"]);
        let obfs = hy2.obfs.unwrap();
        assert_eq!(obfs.obfs_type.as_deref(), Some("salamander"));
        assert_eq!(obfs.password.as_deref(), Some("cry"));
    }

    #[test]
    fn test_hysteria2_insecure() {
        let hy2 = parse("hysteria2://auth@example.com:443?insecure=1");
        assert!(hy2.tls.insecure);
    }

    #[test]
    fn test_hysteria2_without_password() {
        let hy2 = parse("hysteria2://example.com:443");
        assert!(hy2.password.is_none());
    }

    #[test]
    fn test_hy2_alias_scheme() {
        let parser = Hysteria2Parser::new("hy2");
        assert_eq!(parser.scheme(), "hy2");
        assert!(parser.can_parse("hy2://auth@example.com:443"));
        assert!(parser.parse("hy2://auth@example.com:443").is_ok());
    }

    #[test]
    fn test_hysteria2_missing_host() {
        assert!(Hysteria2Parser::new("hysteria2").parse("hysteria2://").is_err());
    }

    #[test]
    fn test_hysteria2_wire_format() {
        let outbound = Hysteria2Parser::new("hy2")
            .parse("hy2://auth@example.com:443#t")
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&outbound.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "hysteria2");
        assert_eq!(value["detour"], "Select");
        assert_eq!(value["tls"]["alpn"][0], "h3");
        assert!(value.get("obfs").is_none());
    }
}
