//! Trojan protocol parser
//!
//! This module provides decoding for Trojan (trojan://) links.
//! Format: trojan://password@host:port?params#tag

use anyhow::{Result, anyhow, bail};
use tracing::trace;

use crate::config::outbound::{Outbound, TrojanOutbound};
use crate::config::shared::OutboundTlsConfig;
use crate::parser::tag::extract_tag;

use super::{
    ProtocolParser, is_flag_set, non_empty, parse_link_url, query_params, tag_or_fallback,
    url_host, url_username,
};

const DEFAULT_PORT: u16 = 443;

// ============================================================================
// Trojan Parser
// ============================================================================

/// Parser for Trojan (trojan://) links
///
/// TLS is always enabled. The server name comes from `sni`, then `peer`,
/// then the host itself.
pub struct TrojanParser;

impl ProtocolParser for TrojanParser {
    fn scheme(&self) -> &str {
        "trojan"
    }

    fn parse(&self, uri: &str) -> Result<Outbound> {
        trace!("Parsing Trojan link");
        let tag = extract_tag(uri);
        let url = parse_link_url(uri, "Trojan")?;

        let password = url_username(&url);
        if password.is_empty() {
            bail!("Trojan link missing password");
        }

        let server = url_host(&url).ok_or_else(|| anyhow!("Trojan link missing host"))?;
        let server_port = url.port().unwrap_or(DEFAULT_PORT);

        let params = query_params(&url);
        let server_name = non_empty(&params, "sni")
            .or_else(|| non_empty(&params, "peer"))
            .unwrap_or(server.as_str());

        let mut tls = OutboundTlsConfig::with_server_name(server_name);
        tls.insecure = is_flag_set(params.get("allowInsecure").map(String::as_str));

        let outbound = Outbound::Trojan(TrojanOutbound {
            tag: tag_or_fallback(tag, "TROJAN", &server, server_port),
            server,
            server_port,
            password,
            tls: Some(tls),
        });
        outbound.validate()?;
        Ok(outbound)
    }
}
