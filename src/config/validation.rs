//! Validation of decoded nodes and of the assembled outbound document.
//!
//! Node validation guards the decoder boundary: a proxy node that fails
//! these checks is never handed out. Document validation catches
//! problems that only show up once groups have been resolved.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, warn};

use crate::config::outbound::Outbound;

/// Flow values accepted for VLESS.
pub const VALID_VLESS_FLOWS: [&str; 3] = ["", "xtls-rprx-vision", "xtls-rprx-vision-udp443"];

/// Length of a textual UUID (8-4-4-4-12).
const UUID_LEN: usize = 36;

// ============================================================================
// Error Types
// ============================================================================

/// A single node failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Server address is empty.
    MissingServer {
        /// Outbound type of the node.
        node_type: &'static str,
    },

    /// Server port is outside `1..=65535`.
    InvalidPort {
        /// Outbound type of the node.
        node_type: &'static str,
    },

    /// Cipher method is empty.
    MissingMethod {
        /// Outbound type of the node.
        node_type: &'static str,
    },

    /// Password is empty.
    MissingPassword {
        /// Outbound type of the node.
        node_type: &'static str,
    },

    /// VLESS UUID is empty.
    MissingUuid,

    /// VLESS UUID is not 36 characters long.
    InvalidUuid {
        /// The offending UUID.
        uuid: String,
    },

    /// VLESS flow is not one of [`VALID_VLESS_FLOWS`].
    UnsupportedFlow {
        /// The offending flow.
        flow: String,
    },

    /// Reality is enabled without a public key.
    RealityMissingPublicKey,

    /// Reality is enabled without a short id.
    RealityMissingShortId,

    /// Selector or URLTest has no members.
    EmptyGroup {
        /// Tag of the group.
        tag: String,
    },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingServer { node_type } => {
                write!(f, "{node_type} outbound must have a server")
            }
            Self::InvalidPort { node_type } => {
                write!(f, "{node_type} outbound must have a port in 1-65535")
            }
            Self::MissingMethod { node_type } => {
                write!(f, "{node_type} outbound must have a method")
            }
            Self::MissingPassword { node_type } => {
                write!(f, "{node_type} outbound must have a password")
            }
            Self::MissingUuid => write!(f, "vless outbound must have a uuid"),
            Self::InvalidUuid { uuid } => {
                write!(f, "vless uuid '{uuid}' is not {UUID_LEN} characters long")
            }
            Self::UnsupportedFlow { flow } => write!(f, "unsupported vless flow '{flow}'"),
            Self::RealityMissingPublicKey => write!(f, "reality public_key must not be empty"),
            Self::RealityMissingShortId => write!(f, "reality short_id must not be empty"),
            Self::EmptyGroup { tag } => write!(f, "group '{tag}' must have outbounds"),
        }
    }
}

impl std::error::Error for NodeError {}

/// Document-level validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Duplicate outbound tag found.
    DuplicateOutboundTag {
        /// The duplicated tag.
        tag: String,
    },

    /// Selector/URLTest outbound references a non-existent outbound.
    GroupMemberNotFound {
        /// The group tag.
        group: String,
        /// The referenced outbound tag that was not found.
        member: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateOutboundTag { tag } => write!(f, "duplicate outbound tag '{tag}'"),
            Self::GroupMemberNotFound { group, member } => {
                write!(f, "group '{group}' references non-existent outbound '{member}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Result
// ============================================================================

/// Result of document validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors found.
    pub errors: Vec<ConfigError>,
}

impl ValidationResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed (no errors).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn add_error(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    /// Log all errors using tracing.
    pub fn log_errors(&self) {
        for error in &self.errors {
            warn!(error = %error, "outbound validation error");
        }
    }
}

// ============================================================================
// Node Validation
// ============================================================================

impl Outbound {
    /// Check the invariants of a single outbound.
    ///
    /// # Errors
    ///
    /// Returns the first failed check.
    pub fn validate(&self) -> Result<(), NodeError> {
        let node_type = self.outbound_type();
        match self {
            Outbound::Shadowsocks(o) => {
                check_endpoint(node_type, &o.server, o.server_port)?;
                if o.method.is_empty() {
                    return Err(NodeError::MissingMethod { node_type });
                }
            }
            Outbound::ShadowsocksR(o) => {
                check_endpoint(node_type, &o.server, o.server_port)?;
                if o.method.is_empty() {
                    return Err(NodeError::MissingMethod { node_type });
                }
                if o.password.is_empty() {
                    return Err(NodeError::MissingPassword { node_type });
                }
            }
            Outbound::Trojan(o) => {
                check_endpoint(node_type, &o.server, o.server_port)?;
                if o.password.is_empty() {
                    return Err(NodeError::MissingPassword { node_type });
                }
            }
            Outbound::Hysteria2(o) => check_endpoint(node_type, &o.server, o.server_port)?,
            Outbound::AnyTls(o) => {
                check_endpoint(node_type, &o.server, o.server_port)?;
                if o.password.is_empty() {
                    return Err(NodeError::MissingPassword { node_type });
                }
            }
            Outbound::VLess(o) => {
                check_endpoint(node_type, &o.server, o.server_port)?;
                if o.uuid.is_empty() {
                    return Err(NodeError::MissingUuid);
                }
                if o.uuid.len() != UUID_LEN {
                    return Err(NodeError::InvalidUuid {
                        uuid: o.uuid.clone(),
                    });
                }
                if let Some(flow) = &o.flow
                    && !VALID_VLESS_FLOWS.contains(&flow.as_str())
                {
                    return Err(NodeError::UnsupportedFlow { flow: flow.clone() });
                }
                if let Some(tls) = &o.tls
                    && tls.reality_enabled()
                    && let Some(reality) = &tls.reality
                {
                    if reality.public_key.as_deref().is_none_or(str::is_empty) {
                        return Err(NodeError::RealityMissingPublicKey);
                    }
                    if reality.short_id.as_deref().is_none_or(str::is_empty) {
                        return Err(NodeError::RealityMissingShortId);
                    }
                }
            }
            Outbound::Selector(o) => {
                if o.outbounds.is_empty() {
                    return Err(NodeError::EmptyGroup { tag: o.tag.clone() });
                }
            }
            Outbound::UrlTest(o) => {
                if o.outbounds.is_empty() {
                    return Err(NodeError::EmptyGroup { tag: o.tag.clone() });
                }
            }
            Outbound::Direct(_) | Outbound::Block(_) => {}
        }
        Ok(())
    }
}

fn check_endpoint(node_type: &'static str, server: &str, port: u16) -> Result<(), NodeError> {
    if server.is_empty() {
        return Err(NodeError::MissingServer { node_type });
    }
    if port == 0 {
        return Err(NodeError::InvalidPort { node_type });
    }
    Ok(())
}

// ============================================================================
// Document Validation
// ============================================================================

/// Validate an assembled outbound list.
///
/// Checks tag uniqueness and that every group member refers to an
/// outbound present in the list.
#[must_use]
pub fn validate_outbounds(outbounds: &[Outbound]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut tags = HashSet::new();

    for outbound in outbounds {
        if !tags.insert(outbound.tag()) {
            result.add_error(ConfigError::DuplicateOutboundTag {
                tag: outbound.tag().to_string(),
            });
        }
    }
    debug!(count = tags.len(), "collected outbound tags");

    for outbound in outbounds {
        let members = match outbound {
            Outbound::Selector(o) => &o.outbounds,
            Outbound::UrlTest(o) => &o.outbounds,
            _ => continue,
        };
        for member in members {
            if !tags.contains(member.as_str()) {
                result.add_error(ConfigError::GroupMemberNotFound {
                    group: outbound.tag().to_string(),
                    member: member.clone(),
                });
            }
        }
    }

    result
}
