//! Shared field structures for outbound documents.
//!
//! This module contains the TLS, uTLS, Reality, V2Ray transport and dial
//! structures that are embedded in several proxy node types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::util::is_false;

// ============================================================================
// Dial Fields
// ============================================================================

/// Dial fields for outbound connections.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DialFields {
    /// The tag of the upstream outbound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detour: Option<String>,
}

// ============================================================================
// TLS Fields
// ============================================================================

/// TLS configuration for outbound (client) connections.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OutboundTlsConfig {
    /// Enable TLS
    #[serde(default, skip_serializing_if = "is_false")]
    pub enabled: bool,

    /// Server name for verification and SNI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    /// Accept any server certificate (insecure)
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure: bool,

    /// List of supported ALPN protocols
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,

    /// uTLS configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utls: Option<UtlsConfig>,

    /// Reality configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reality: Option<OutboundRealityConfig>,
}

impl OutboundTlsConfig {
    /// Plain TLS with the given server name.
    pub fn with_server_name(server_name: impl Into<String>) -> Self {
        Self {
            enabled: true,
            server_name: Some(server_name.into()),
            ..Default::default()
        }
    }

    /// Returns `true` when a Reality block is present and enabled.
    pub fn reality_enabled(&self) -> bool {
        self.reality.as_ref().is_some_and(|r| r.enabled)
    }
}

/// uTLS configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UtlsConfig {
    /// Enable uTLS
    #[serde(default, skip_serializing_if = "is_false")]
    pub enabled: bool,

    /// Fingerprint to use: chrome, firefox, edge, safari, 360, qq, ios, android, random, randomized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl UtlsConfig {
    pub fn fingerprint(fingerprint: impl Into<String>) -> Self {
        Self {
            enabled: true,
            fingerprint: Some(fingerprint.into()),
        }
    }
}

/// Reality configuration for outbound (client).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OutboundRealityConfig {
    /// Enable Reality
    #[serde(default, skip_serializing_if = "is_false")]
    pub enabled: bool,

    /// Public key (generated by `sing-box generate reality-keypair`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// Short ID (hex string, 0-8 digits)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

// ============================================================================
// V2Ray Transport
// ============================================================================

/// V2Ray transport configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum V2RayTransport {
    /// HTTP transport (HTTP/2 when TLS is enabled)
    Http(HttpTransport),
    /// WebSocket transport
    #[serde(rename = "ws")]
    WebSocket(WebSocketTransport),
    /// gRPC transport
    #[serde(rename = "grpc")]
    Grpc(GrpcTransport),
}

/// HTTP transport configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpTransport {
    /// Host domains
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,

    /// HTTP request path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// WebSocket transport configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct WebSocketTransport {
    /// HTTP request path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Extra headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// gRPC transport configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct GrpcTransport {
    /// gRPC service name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}
