//! Share-link Parsing Module
//!
//! This module provides functionality for:
//! - Extracting and sanitizing the display label of a link
//! - Decoding the Base64 variants found in share links
//! - Decoding protocol links (ss://, ssr://, trojan://, hysteria2://, hy2://,
//!   anytls://, vless://) into validated outbound nodes
//! - Dispatching a link to its decoder by scheme

pub mod base64;
pub mod protocols;
pub mod tag;

pub use protocols::{ProtocolParser, ProtocolRegistry, extract_scheme, split_link_lines};
pub use tag::extract_tag;
