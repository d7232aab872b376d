//! VLESS protocol parser
//!
//! This module provides decoding for VLESS (vless://) links.
//! Format: vless://uuid@host:port?params#tag

use std::collections::{BTreeMap, HashMap};

use anyhow::{Result, anyhow, bail};
use tracing::{debug, trace};

use crate::config::outbound::{Outbound, VLessOutbound};
use crate::config::shared::{
    DialFields, GrpcTransport, HttpTransport, OutboundRealityConfig, OutboundTlsConfig,
    UtlsConfig, V2RayTransport, WebSocketTransport,
};
use crate::parser::tag::extract_tag;

use super::{
    ProtocolParser, is_flag_set, non_empty, parse_link_url, query_params, tag_or_fallback,
    url_host, url_username,
};

const DEFAULT_PATH: &str = "/";
const DEFAULT_REALITY_FINGERPRINT: &str = "chrome";

// ============================================================================
// VLESS Parser
// ============================================================================

/// Parser for VLESS (vless://) links
///
/// Format: vless://uuid@host:port?params#tag
pub struct VLessParser;

impl ProtocolParser for VLessParser {
    fn scheme(&self) -> &str {
        "vless"
    }

    fn parse(&self, uri: &str) -> Result<Outbound> {
        trace!("Parsing VLESS link");
        let tag = extract_tag(uri);
        let url = parse_link_url(uri, "VLESS")?;

        let uuid = url_username(&url);
        if uuid.is_empty() {
            bail!("VLESS link missing UUID");
        }

        let server = url_host(&url).ok_or_else(|| anyhow!("VLESS link missing host"))?;
        let server_port = url
            .port()
            .ok_or_else(|| anyhow!("VLESS link missing port"))?;

        let params = query_params(&url);
        let transport = self.build_transport(&params);
        let tls = self.build_tls(&params, &server)?;

        let outbound = Outbound::VLess(VLessOutbound {
            tag: tag_or_fallback(tag, "VLESS", &server, server_port),
            server,
            server_port,
            uuid,
            flow: non_empty(&params, "flow").map(str::to_string),
            packet_encoding: non_empty(&params, "packetEncoding").map(str::to_string),
            tls,
            transport,
            dial: DialFields::default(),
        });
        outbound.validate()?;
        Ok(outbound)
    }
}

impl VLessParser {
    /// Maps `type` to a V2Ray transport. TCP and unknown types use none.
    fn build_transport(&self, params: &HashMap<String, String>) -> Option<V2RayTransport> {
        let path = || non_empty(params, "path").unwrap_or(DEFAULT_PATH).to_string();

        match non_empty(params, "type").unwrap_or("tcp") {
            "tcp" => None,
            "ws" | "websocket" => {
                let mut headers = BTreeMap::new();
                if let Some(host) = non_empty(params, "host") {
                    headers.insert("Host".to_string(), host.to_string());
                }
                Some(V2RayTransport::WebSocket(WebSocketTransport {
                    path: Some(path()),
                    headers,
                }))
            }
            "grpc" => Some(V2RayTransport::Grpc(GrpcTransport {
                service_name: non_empty(params, "serviceName")
                    .or_else(|| non_empty(params, "service"))
                    .map(str::to_string),
            })),
            "h2" | "http" | "https" => Some(V2RayTransport::Http(HttpTransport {
                host: non_empty(params, "host")
                    .map(|host| vec![host.to_string()])
                    .unwrap_or_default(),
                path: Some(path()),
            })),
            other => {
                debug!(transport = other, "unknown VLESS transport, using tcp");
                None
            }
        }
    }

    /// Maps `security` to a TLS block.
    fn build_tls(
        &self,
        params: &HashMap<String, String>,
        server: &str,
    ) -> Result<Option<OutboundTlsConfig>> {
        let security = params.get("security").map(String::as_str).unwrap_or("");
        match security {
            "tls" => {
                let server_name = non_empty(params, "sni")
                    .or_else(|| non_empty(params, "peer"))
                    .unwrap_or(server);
                let mut tls = OutboundTlsConfig::with_server_name(server_name);
                tls.insecure = is_flag_set(params.get("allowInsecure").map(String::as_str))
                    || is_flag_set(params.get("skip-cert-verify").map(String::as_str));
                tls.utls = non_empty(params, "fp").map(UtlsConfig::fingerprint);
                if let Some(alpn) = non_empty(params, "alpn") {
                    tls.alpn = alpn.split(',').map(str::to_string).collect();
                }
                Ok(Some(tls))
            }
            "reality" => {
                let public_key = non_empty(params, "pbk")
                    .ok_or_else(|| anyhow!("VLESS reality link missing public key (pbk)"))?;
                let short_id = non_empty(params, "sid")
                    .ok_or_else(|| anyhow!("VLESS reality link missing short id (sid)"))?;

                let mut tls =
                    OutboundTlsConfig::with_server_name(non_empty(params, "sni").unwrap_or(server));
                tls.utls = Some(UtlsConfig::fingerprint(
                    non_empty(params, "fp").unwrap_or(DEFAULT_REALITY_FINGERPRINT),
                ));
                tls.reality = Some(OutboundRealityConfig {
                    enabled: true,
                    public_key: Some(public_key.to_string()),
                    short_id: Some(short_id.to_string()),
                });
                Ok(Some(tls))
            }
            "none" | "" => Ok(None),
            other => bail!("unsupported VLESS security type: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn parse(query_and_tag: &str) -> VLessOutbound {
        let uri = format!("vless://{}@example.com:443{}", UUID, query_and_tag);
        match VLessParser.parse(&uri).unwrap() {
            Outbound::VLess(vless) => vless,
            other => panic!("Expected VLess outbound, got {:?}", other),
        }
    }

    fn parse_err(query: &str) -> anyhow::Error {
        let uri = format!("vless://{}@example.com:443{}", UUID, query);
        VLessParser.parse(&uri).unwrap_err()
    }

    #[test]
    fn test_vless_plain_tcp() {
        let vless = parse("#node");
        assert_eq!(vless.tag, "node");
        assert_eq!(vless.uuid, UUID);
        assert_eq!(vless.server, "example.com");
        assert_eq!(vless.server_port, 443);
        assert!(vless.tls.is_none());
        assert!(vless.transport.is_none());
        assert!(vless.flow.is_none());
    }

    #[test]
    fn test_vless_fallback_tag() {
        assert_eq!(parse("").tag, "VLESS-example.com:443");
    }

    #[test]
    fn test_vless_tls() {
        let vless = parse("?security=tls&peer=p.example.com&fp=firefox&alpn=h2,http/1.1&allowInsecure=1");
        let tls = vless.tls.unwrap();
        assert!(tls.enabled);
        assert!(tls.insecure);
        assert_eq!(tls.server_name.as_deref(), Some("p.example.com"));
        assert_eq!(tls.utls.unwrap().fingerprint.as_deref(), Some("firefox"));
        assert_eq!(tls.alpn, vec!["h2", "http/1.1"]);
        assert!(tls.reality.is_none());
    }

    #[test]
    fn test_vless_tls_skip_cert_verify_and_default_sni() {
        let vless = parse("?security=tls&skip-cert-verify=true");
        let tls = vless.tls.unwrap();
        assert!(tls.insecure);
        assert_eq!(tls.server_name.as_deref(), Some("example.com"));
        assert!(tls.utls.is_none());
    }

    #[test]
    fn test_vless_reality() {
        let vless = parse("?security=reality&pbk=public-key&sid=0123abcd&sni=www.apple.com&flow=xtls-rprx-vision");
        assert_eq!(vless.flow.as_deref(), Some("xtls-rprx-vision"));
        let tls = vless.tls.unwrap();
        assert_eq!(tls.server_name.as_deref(), Some("www.apple.com"));
        assert_eq!(tls.utls.unwrap().fingerprint.as_deref(), Some("chrome"));
        let reality = tls.reality.unwrap();
        assert!(reality.enabled);
        assert_eq!(reality.public_key.as_deref(), Some("public-key"));
        assert_eq!(reality.short_id.as_deref(), Some("0123abcd"));
    }

    #[test]
    fn test_vless_reality_requires_pbk_and_sid() {
        assert!(parse_err("?security=reality&sid=01").to_string().contains("pbk"));
        assert!(parse_err("?security=reality&pbk=k").to_string().contains("sid"));
        assert!(parse_err("?security=reality&pbk=&sid=01").to_string().contains("pbk"));
    }

    #[test]
    fn test_vless_unsupported_security() {
        let err = parse_err("?security=xtls");
        assert!(err.to_string().contains("unsupported VLESS security type: xtls"));
    }

    #[test]
    fn test_vless_security_none() {
        assert!(parse("?security=none").tls.is_none());
    }

    #[test]
    fn test_vless_websocket() {
        let vless = parse("?type=ws&host=cdn.example.com&security=tls");
        match vless.transport {
            Some(V2RayTransport::WebSocket(ws)) => {
                assert_eq!(ws.path.as_deref(), Some("/"));
                assert_eq!(
                    ws.headers.get("Host").map(String::as_str),
                    Some("cdn.example.com")
                );
            }
            other => panic!("Expected WebSocket transport, got {:?}", other),
        }
    }

    #[test]
    fn test_vless_grpc_service_alias() {
        let vless = parse("?type=grpc&service=svc");
        match vless.transport {
            Some(V2RayTransport::Grpc(grpc)) => {
                assert_eq!(grpc.service_name.as_deref(), Some("svc"));
            }
            other => panic!("Expected gRPC transport, got {:?}", other),
        }
    }

    #[test]
    fn test_vless_h2_transport() {
        let vless = parse("?type=h2&path=%2Fh2&host=h.example.com");
        match vless.transport {
            Some(V2RayTransport::Http(http)) => {
                assert_eq!(http.path.as_deref(), Some("/h2"));
                assert_eq!(http.host, vec!["h.example.com"]);
            }
            other => panic!("Expected HTTP transport, got {:?}", other),
        }
    }

    #[test]
    fn test_vless_unknown_transport_falls_back_to_tcp() {
        assert!(parse("?type=kcp").transport.is_none());
    }

    #[test]
    fn test_vless_packet_encoding() {
        assert_eq!(
            parse("?packetEncoding=xudp").packet_encoding.as_deref(),
            Some("xudp")
        );
    }

    #[test]
    fn test_vless_invalid_flow() {
        assert!(parse_err("?flow=xtls-rprx-direct").to_string().contains("flow"));
    }

    #[test]
    fn test_vless_uuid_length() {
        assert!(VLessParser.parse("vless://short@example.com:443").is_err());
        assert!(VLessParser.parse("vless://@example.com:443").is_err());
    }

    #[test]
    fn test_vless_requires_port() {
        let uri = format!("vless://{}@example.com", UUID);
        assert!(VLessParser.parse(&uri).is_err());
    }

    #[test]
    fn test_vless_wire_format() {
        let outbound = VLessParser
            .parse(&format!(
                "vless://{}@example.com:443?type=ws&path=%2Fray&security=tls#t",
                UUID
            ))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&outbound.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "vless");
        assert_eq!(value["transport"]["type"], "ws");
        assert_eq!(value["transport"]["path"], "/ray");
        assert_eq!(value["tls"]["server_name"], "example.com");
        assert!(value.get("flow").is_none());
    }
}
