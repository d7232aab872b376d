//! ShadowsocksR protocol parser
//!
//! Format: ssr://BASE64(host:port:protocol:method:obfs:BASE64(password)/?params)
//!
//! `params` is an `&`-separated list whose values are Base64 as well:
//! `obfsparam`, `protoparam`, `remarks` and `group`.

use anyhow::{Result, anyhow, bail};
use tracing::{debug, trace};

use crate::config::outbound::{Outbound, ShadowsocksROutbound};
use crate::parser::base64::decode_base64_url_first;
use crate::parser::tag::sanitize_tag;

use super::{ProtocolParser, fallback_tag, parse_port};

/// Obfs names used to split an obfs field that swallowed the password.
const KNOWN_OBFS: [&str; 5] = [
    "plain",
    "http_simple",
    "http_post",
    "random_head",
    "tls1.2_ticket_auth",
];

const PARAM_SEPARATOR: &str = "/?";

// ============================================================================
// ShadowsocksR Parser
// ============================================================================

/// Parser for ShadowsocksR (ssr://) links
pub struct ShadowsocksRParser;

impl ProtocolParser for ShadowsocksRParser {
    fn scheme(&self) -> &str {
        "ssr"
    }

    fn parse(&self, uri: &str) -> Result<Outbound> {
        trace!("Parsing ShadowsocksR link");
        let payload = uri
            .trim()
            .strip_prefix("ssr://")
            .ok_or_else(|| anyhow!("Invalid ShadowsocksR link: missing ssr:// prefix"))?;
        let payload = payload.split_once('#').map_or(payload, |(before, _)| before);
        if payload.trim().is_empty() {
            bail!("Empty ShadowsocksR payload");
        }

        let (main, outer_params) = match payload.split_once(PARAM_SEPARATOR) {
            Some((main, params)) => (main, params),
            None => (payload, ""),
        };

        let decoded = decode_base64_url_first(main).unwrap_or_else(|_| {
            trace!("ShadowsocksR payload is not Base64, using it literally");
            main.to_string()
        });

        let layout = SsrLayout::split(&decoded)?;
        let node = layout.into_outbound(outer_params)?;

        let outbound = Outbound::ShadowsocksR(node);
        outbound.validate()?;
        Ok(outbound)
    }
}

// ============================================================================
// Layout Recovery
// ============================================================================

/// Colon-separated fields of a decoded SSR payload.
struct SsrLayout {
    parts: Vec<String>,
    /// The obfs/password boundary had to be guessed.
    recovered: bool,
}

impl SsrLayout {
    /// Splits the decoded payload, recovering the five-field layout where
    /// obfs and password ran together.
    fn split(decoded: &str) -> Result<Self> {
        let mut parts: Vec<String> = decoded.split(':').map(str::to_string).collect();
        let mut recovered = false;

        if parts.len() == 5 {
            recovered = true;
            let (_, after_eq) = decoded.split_once('=').ok_or_else(|| {
                anyhow!("Invalid ShadowsocksR layout: 5 fields and no '=' to recover the password")
            })?;
            parts.push(after_eq.to_string());

            if let Some(obfs) = KNOWN_OBFS.iter().copied().find(|obfs| parts[4].contains(obfs)) {
                let rest = parts[4].rsplit(obfs).next().unwrap_or_default().to_string();
                parts[5] = rest;
                parts[4] = obfs.to_string();
            }
            debug!(obfs = %parts[4], "recovered five-field ShadowsocksR layout");
        }

        if parts.len() < 6 {
            bail!(
                "Invalid ShadowsocksR layout: expected at least 6 fields, got {}",
                parts.len()
            );
        }

        Ok(Self { parts, recovered })
    }

    fn into_outbound(self, outer_params: &str) -> Result<ShadowsocksROutbound> {
        let server = self.parts[0].clone();
        let server_port = parse_port(&self.parts[1])?;

        let mut password_slot = self.parts[5].clone();
        if !outer_params.is_empty() {
            password_slot.push_str(PARAM_SEPARATOR);
            password_slot.push_str(outer_params);
        }
        let (mut password_blob, mut params) = match password_slot.split_once(PARAM_SEPARATOR) {
            Some((password, params)) => (password.to_string(), params.to_string()),
            None => (password_slot, String::new()),
        };

        if self.recovered
            && let Some(index) = password_blob.find("remarks")
        {
            let trailing = password_blob.split_off(index);
            params = if params.is_empty() {
                trailing
            } else {
                format!("{}&{}", trailing, params)
            };
        }

        let password = decode_base64_url_first(&password_blob).unwrap_or(password_blob);
        let extras = SsrParams::parse(&params);

        let tag = extras
            .remarks
            .or(extras.group)
            .unwrap_or_else(|| fallback_tag("SSR", &server, server_port));

        Ok(ShadowsocksROutbound {
            tag,
            server,
            server_port,
            method: self.parts[3].clone(),
            password,
            protocol: non_empty(&self.parts[2]),
            protocol_param: extras.protocol_param,
            obfs: non_empty(&self.parts[4]),
            obfs_param: extras.obfs_param,
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Decoded values of the `/?` parameter list.
#[derive(Debug, Default)]
struct SsrParams {
    obfs_param: Option<String>,
    protocol_param: Option<String>,
    remarks: Option<String>,
    group: Option<String>,
}

impl SsrParams {
    /// Entries that are not `key=value` or whose value is not Base64 are
    /// skipped.
    fn parse(params: &str) -> Self {
        let mut parsed = Self::default();
        for (key, raw) in params.split('&').filter_map(|kv| kv.split_once('=')) {
            let Ok(value) = decode_base64_url_first(raw) else {
                trace!(key, "skipping ShadowsocksR parameter that is not Base64");
                continue;
            };
            match key {
                "obfsparam" => parsed.obfs_param = non_empty(&value),
                "protoparam" => parsed.protocol_param = non_empty(&value),
                "remarks" => parsed.remarks = non_empty(&sanitize_tag(&value)),
                "group" => parsed.group = non_empty(&sanitize_tag(&value)),
                _ => {}
            }
        }
        parsed
    }
}
