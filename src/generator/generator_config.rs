use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::outbound::Outbound;
use crate::transform::DEFAULT_EXCLUDED_TAG_KEYWORDS;

use super::helpers::expand_tilde;

// ============================================================================
// Generator Config Types
// ============================================================================

/// Generator configuration parsed from TOML file
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GeneratorConfig {
    /// Link list file, one share link per line (required)
    pub links: String,

    /// Output file path, default "./out/outbounds.json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Member used for groups that resolve to nothing. Empty keeps such
    /// groups empty.
    #[serde(default = "default_empty_group_outbound")]
    pub empty_group_outbound: String,

    /// Nodes whose tag contains any of these are dropped before grouping
    #[serde(default = "default_exclude_tag_keywords")]
    pub exclude_tag_keywords: Vec<String>,

    /// Group declarations and static outbounds, emitted before the nodes
    #[serde(default)]
    pub outbounds: Vec<Outbound>,
}

// ============================================================================
// Generator Config Implementation
// ============================================================================

impl GeneratorConfig {
    /// Parse generator config from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: GeneratorConfig =
            toml::from_str(content).context("Failed to parse generator config TOML")?;

        if config.links.trim().is_empty() {
            bail!("`links` must name a link list file");
        }

        for outbound in &config.outbounds {
            if outbound.tag().is_empty() {
                bail!("Outbound of type '{}' has no tag", outbound.outbound_type());
            }
            if outbound.is_proxy_node() {
                outbound
                    .validate()
                    .with_context(|| format!("Invalid static outbound '{}'", outbound.tag()))?;
            }
        }

        Ok(config)
    }

    /// Member used for empty groups, `None` when disabled
    pub fn empty_group_fallback(&self) -> Option<&str> {
        let fallback = self.empty_group_outbound.trim();
        (!fallback.is_empty()).then_some(fallback)
    }

    /// Load generator config from file path
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read generator config from {:?}", path))?;
        Self::from_toml(&content)
    }

    /// Load generator config from a path, expanding `~`
    pub async fn load(path: &str) -> Result<Self> {
        let expanded = expand_tilde(path);
        Self::from_file(Path::new(&expanded)).await
    }
}

fn default_output() -> String {
    "./out/outbounds.json".to_string()
}

fn default_empty_group_outbound() -> String {
    "block".to_string()
}

fn default_exclude_tag_keywords() -> Vec<String> {
    DEFAULT_EXCLUDED_TAG_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}
