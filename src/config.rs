use serde::{Deserialize, Serialize};

use crate::config::outbound::Outbound;

pub mod outbound;
pub mod shared;
pub mod util;
pub mod validation;

/// Generated outbound document
///
/// This is the `{"outbounds": [...]}` fragment merged into a full sing-box
/// configuration by downstream tooling.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OutboundDocument {
    /// Outbound configurations: groups first, then proxy nodes
    #[serde(default)]
    pub outbounds: Vec<Outbound>,
}

impl OutboundDocument {
    pub fn new(outbounds: Vec<Outbound>) -> Self {
        Self { outbounds }
    }

    /// Whether an outbound with `tag` exists
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.outbounds.iter().any(|o| o.tag() == tag)
    }

    /// Number of proxy nodes in the document
    pub fn node_count(&self) -> usize {
        self.outbounds.iter().filter(|o| o.is_proxy_node()).count()
    }

    /// Serialize the document to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize the document to a pretty-printed JSON string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
