use serde::{Deserialize, Serialize};

use crate::config::shared::{DialFields, OutboundTlsConfig, V2RayTransport};
use crate::config::util::{is_false, is_zero_u32};

// ============================================================================
// Outbound Enum
// ============================================================================

/// Outbound configuration enum
///
/// The six proxy node variants are produced by the link decoders; the group
/// and built-in variants come from group declarations.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    /// Shadowsocks node
    Shadowsocks(ShadowsocksOutbound),
    /// ShadowsocksR node
    #[serde(rename = "shadowsocksr")]
    ShadowsocksR(ShadowsocksROutbound),
    /// Trojan node
    Trojan(TrojanOutbound),
    /// Hysteria2 node
    Hysteria2(Hysteria2Outbound),
    /// AnyTLS node
    #[serde(rename = "anytls")]
    AnyTls(AnyTlsOutbound),
    /// VLESS node
    #[serde(rename = "vless")]
    VLess(VLessOutbound),
    /// Selector outbound (manual selection)
    Selector(SelectorOutbound),
    /// URLTest outbound (automatic selection)
    #[serde(rename = "urltest")]
    UrlTest(UrlTestOutbound),
    /// Direct outbound
    Direct(DirectOutbound),
    /// Block outbound
    Block(BlockOutbound),
}

impl Outbound {
    /// Display label of the outbound.
    pub fn tag(&self) -> &str {
        match self {
            Outbound::Shadowsocks(o) => &o.tag,
            Outbound::ShadowsocksR(o) => &o.tag,
            Outbound::Trojan(o) => &o.tag,
            Outbound::Hysteria2(o) => &o.tag,
            Outbound::AnyTls(o) => &o.tag,
            Outbound::VLess(o) => &o.tag,
            Outbound::Selector(o) => &o.tag,
            Outbound::UrlTest(o) => &o.tag,
            Outbound::Direct(o) => &o.tag,
            Outbound::Block(o) => &o.tag,
        }
    }

    /// Wire discriminant written to the `type` field.
    pub fn outbound_type(&self) -> &'static str {
        match self {
            Outbound::Shadowsocks(_) => "shadowsocks",
            Outbound::ShadowsocksR(_) => "shadowsocksr",
            Outbound::Trojan(_) => "trojan",
            Outbound::Hysteria2(_) => "hysteria2",
            Outbound::AnyTls(_) => "anytls",
            Outbound::VLess(_) => "vless",
            Outbound::Selector(_) => "selector",
            Outbound::UrlTest(_) => "urltest",
            Outbound::Direct(_) => "direct",
            Outbound::Block(_) => "block",
        }
    }

    /// Server address of a proxy node.
    pub fn server(&self) -> Option<&str> {
        match self {
            Outbound::Shadowsocks(o) => Some(&o.server),
            Outbound::ShadowsocksR(o) => Some(&o.server),
            Outbound::Trojan(o) => Some(&o.server),
            Outbound::Hysteria2(o) => Some(&o.server),
            Outbound::AnyTls(o) => Some(&o.server),
            Outbound::VLess(o) => Some(&o.server),
            Outbound::Selector(_)
            | Outbound::UrlTest(_)
            | Outbound::Direct(_)
            | Outbound::Block(_) => None,
        }
    }

    /// Whether this outbound was decoded from a share link.
    pub fn is_proxy_node(&self) -> bool {
        self.server().is_some()
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Proxy Node Types
// ============================================================================

/// Shadowsocks outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ShadowsocksOutbound {
    /// Tag of the outbound
    #[serde(default)]
    pub tag: String,

    /// Server address
    pub server: String,

    /// Server port
    pub server_port: u16,

    /// Encryption method
    pub method: String,

    /// Password
    pub password: String,
}

/// ShadowsocksR outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ShadowsocksROutbound {
    /// Tag of the outbound
    #[serde(default)]
    pub tag: String,

    /// Server address
    pub server: String,

    /// Server port
    pub server_port: u16,

    /// Encryption method
    pub method: String,

    /// Password
    pub password: String,

    /// SSR protocol (e.g., "origin", "auth_aes128_md5")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// SSR protocol parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_param: Option<String>,

    /// SSR obfuscation (e.g., "plain", "http_simple")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,

    /// SSR obfuscation parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs_param: Option<String>,
}

/// Trojan outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TrojanOutbound {
    /// Tag of the outbound
    #[serde(default)]
    pub tag: String,

    /// Server address
    pub server: String,

    /// Server port
    pub server_port: u16,

    /// Trojan password
    pub password: String,

    /// TLS configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<OutboundTlsConfig>,
}

/// Hysteria2 outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Hysteria2Outbound {
    /// Tag of the outbound
    #[serde(default)]
    pub tag: String,

    /// Server address
    pub server: String,

    /// Server port
    pub server_port: u16,

    /// Authentication password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Upload bandwidth in Mbps
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub up_mbps: u32,

    /// Download bandwidth in Mbps
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub down_mbps: u32,

    /// Obfuscation configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<Hysteria2Obfs>,

    /// TLS configuration
    #[serde(default)]
    pub tls: OutboundTlsConfig,

    /// Dial fields
    #[serde(flatten)]
    pub dial: DialFields,
}

/// Hysteria2 obfuscation configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Hysteria2Obfs {
    /// Obfuscation type (only "salamander")
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub obfs_type: Option<String>,

    /// Obfuscation password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// AnyTLS outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AnyTlsOutbound {
    /// Tag of the outbound
    #[serde(default)]
    pub tag: String,

    /// Server address
    pub server: String,

    /// Server port
    pub server_port: u16,

    /// Password
    pub password: String,

    /// Interval checking for idle sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_session_check_interval: Option<String>,

    /// Idle timeout before a session is closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_session_timeout: Option<String>,

    /// Minimum number of idle sessions kept open
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub min_idle_session: u32,

    /// TLS configuration
    #[serde(default)]
    pub tls: OutboundTlsConfig,

    /// Dial fields
    #[serde(flatten)]
    pub dial: DialFields,
}

/// VLESS outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct VLessOutbound {
    /// Tag of the outbound
    #[serde(default)]
    pub tag: String,

    /// Server address
    pub server: String,

    /// Server port
    pub server_port: u16,

    /// VLESS UUID
    pub uuid: String,

    /// VLESS flow (e.g., "xtls-rprx-vision")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    /// UDP packet encoding: packetaddr, xudp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_encoding: Option<String>,

    /// TLS configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<OutboundTlsConfig>,

    /// V2Ray transport configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<V2RayTransport>,

    /// Dial fields
    #[serde(flatten)]
    pub dial: DialFields,
}

// ============================================================================
// Group Types
// ============================================================================

/// Action of a group filter rule
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    /// Keep only nodes matching at least one pattern
    Include,
    /// Drop nodes matching any pattern
    Exclude,
}

/// Include/exclude directive evaluated against node tags.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FilterRule {
    /// Include or exclude
    pub action: FilterAction,

    /// Literal or regex patterns; each may hold `|`-separated alternatives
    #[serde(default, rename = "keywords")]
    pub patterns: Vec<String>,
}

impl FilterRule {
    pub fn include<S: Into<String>>(patterns: impl IntoIterator<Item = S>) -> Self {
        Self {
            action: FilterAction::Include,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exclude<S: Into<String>>(patterns: impl IntoIterator<Item = S>) -> Self {
        Self {
            action: FilterAction::Exclude,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Selector outbound configuration (manual selection)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectorOutbound {
    /// Tag of the outbound
    #[serde(default)]
    pub tag: String,

    /// List of outbound tags to select from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outbounds: Vec<String>,

    /// Default outbound tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Filter rules, consumed when members are resolved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<FilterRule>,

    /// Interrupt existing connections when selection changes
    #[serde(default, skip_serializing_if = "is_false")]
    pub interrupt_exist_connections: bool,
}

/// URLTest outbound configuration (automatic selection)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlTestOutbound {
    /// Tag of the outbound
    #[serde(default)]
    pub tag: String,

    /// List of outbound tags to test
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outbounds: Vec<String>,

    /// Filter rules, consumed when members are resolved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<FilterRule>,

    /// Test URL (default: https://www.gstatic.com/generate_204)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Test interval (default: 3m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    /// Tolerance in milliseconds (default: 50)
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub tolerance: u32,

    /// Idle timeout (default: 30m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<String>,

    /// Interrupt existing connections when selection changes
    #[serde(default, skip_serializing_if = "is_false")]
    pub interrupt_exist_connections: bool,
}

/// Direct outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectOutbound {
    /// Tag of the outbound
    #[serde(default)]
    pub tag: String,
}

/// Block outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockOutbound {
    /// Tag of the outbound
    #[serde(default)]
    pub tag: String,
}
