//! Concurrent link decoding
//!
//! Every raw link is decoded on its own tokio task. Results are drained as
//! they complete, so the batch order is completion order; each node keeps
//! the index of the link it came from for callers that need input order.

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::outbound::Outbound;
use crate::parser::{ProtocolRegistry, extract_scheme};

// ============================================================================
// Decode Batch
// ============================================================================

/// A successfully decoded link and its position in the input list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedNode {
    pub index: usize,
    pub outbound: Outbound,
}

/// Result of decoding a list of links
#[derive(Debug, Default)]
pub struct DecodeBatch {
    /// Decoded nodes in completion order
    pub nodes: Vec<DecodedNode>,
    /// Number of links submitted
    pub total: usize,
    /// Number of links that failed to decode
    pub failed: usize,
}

impl DecodeBatch {
    pub fn success_count(&self) -> usize {
        self.nodes.len()
    }

    /// Fraction of links that decoded, `0.0` for an empty batch
    pub fn success_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.success_count() as f64 / self.total as f64
    }

    /// Serializes every decoded node to its JSON document
    pub fn to_json_documents(&self) -> Result<Vec<String>> {
        self.nodes
            .iter()
            .map(|node| Ok(node.outbound.to_json()?))
            .collect()
    }

    /// Consumes the batch, returning outbounds in input order
    pub fn into_ordered_outbounds(mut self) -> Vec<Outbound> {
        self.nodes.sort_by_key(|node| node.index);
        self.nodes.into_iter().map(|node| node.outbound).collect()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Decodes `links` concurrently, one task per link.
///
/// Failures are logged and counted; they never abort the batch.
pub async fn decode_links<I, S>(registry: Arc<ProtocolRegistry>, links: I) -> DecodeBatch
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tasks = JoinSet::new();
    let mut total = 0;

    for (index, link) in links.into_iter().enumerate() {
        let registry = Arc::clone(&registry);
        let link: String = link.into();
        tasks.spawn(async move {
            let result = registry.parse_uri(&link);
            (index, link, result)
        });
        total += 1;
    }
    debug!("Dispatched {} decode tasks", total);

    let mut batch = DecodeBatch {
        nodes: Vec::with_capacity(total),
        total,
        failed: 0,
    };

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, _, Ok(outbound))) => {
                debug!("Decoded link #{} as '{}'", index, outbound.tag());
                batch.nodes.push(DecodedNode { index, outbound });
            }
            Ok((index, link, Err(e))) => {
                warn!("Failed to decode link #{} ({}): {:#}", index, preview(&link), e);
                batch.failed += 1;
            }
            Err(e) => {
                warn!("Decode task did not complete: {}", e);
                batch.failed += 1;
            }
        }
    }

    info!(
        "decoded {}/{} ({:.1}%)",
        batch.success_count(),
        batch.total,
        batch.success_ratio() * 100.0
    );
    batch
}

/// Scheme and `host:port` of a link, without userinfo, query or label.
///
/// Links without a userinfo part (Base64 payloads) only show the scheme.
fn preview(link: &str) -> String {
    let scheme = extract_scheme(link);
    let rest = link.split_once("://").map_or("", |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();

    match authority.rsplit_once('@') {
        Some((_, host)) => format!("{}://{}", scheme, host),
        None => format!("{}://<encoded>", scheme),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn registry() -> Arc<ProtocolRegistry> {
        Arc::new(ProtocolRegistry::with_builtin_parsers())
    }

    fn links() -> Vec<String> {
        vec![
            "trojan://pw@t.example.com:443#trojan".to_string(),
            "ss://aes-128-gcm:pw@s.example.com:8388#ss".to_string(),
            "vmess://unsupported".to_string(),
            format!("vless://{}@v.example.com:443?security=reality#bad", UUID),
            "hy2://auth@h.example.com:443#hy2".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_decode_links_counts() {
        let batch = decode_links(registry(), links()).await;
        assert_eq!(batch.total, 5);
        assert_eq!(batch.failed, 2);
        assert_eq!(batch.success_count(), 3);
        assert!((batch.success_ratio() - 0.6).abs() < f64::EPSILON);
        assert_eq!(batch.to_json_documents().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_into_ordered_outbounds_restores_input_order() {
        let batch = decode_links(registry(), links()).await;
        let tags: Vec<String> = batch
            .into_ordered_outbounds()
            .iter()
            .map(|o| o.tag().to_string())
            .collect();
        assert_eq!(tags, vec!["trojan", "ss", "hy2"]);
    }

    #[tokio::test]
    async fn test_indices_refer_to_input_positions() {
        let batch = decode_links(registry(), links()).await;
        let mut indices: Vec<usize> = batch.nodes.iter().map(|n| n.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 4]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let batch = decode_links(registry(), Vec::<String>::new()).await;
        assert_eq!(batch.total, 0);
        assert_eq!(batch.success_count(), 0);
        assert_eq!(batch.success_ratio(), 0.0);
    }

    #[tokio::test]
    async fn test_documents_use_wire_format() {
        let batch = decode_links(registry(), ["trojan://pw@t.example.com:443#t"]).await;
        let docs = batch.to_json_documents().unwrap();
        let value: serde_json::Value = serde_json::from_str(&docs[0]).unwrap();
        assert_eq!(value["type"], "trojan");
        assert_eq!(value["server_port"], 443);
    }

    #[test]
    fn test_preview_hides_credentials() {
        assert_eq!(
            preview("trojan://secret-password@example.com:443?sni=a#HK"),
            "trojan://example.com:443"
        );
        assert_eq!(
            preview("ss://aes-128-gcm:p@ss@1.2.3.4:8388#x"),
            "ss://1.2.3.4:8388"
        );
        assert_eq!(preview("ssr://c2VjcmV0OjQ0Mw"), "ssr://<encoded>");
        assert_eq!(preview("garbage"), "://<encoded>");
    }
}
