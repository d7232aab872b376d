//! Outbound document generator
//!
//! This module reads a local link list, decodes it into proxy nodes,
//! resolves the configured groups against those nodes and writes the
//! resulting `{"outbounds": [...]}` document.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::config::OutboundDocument;
use crate::config::outbound::{BlockOutbound, Outbound};
use crate::config::validation::validate_outbounds;
use crate::parser::{ProtocolRegistry, split_link_lines};
use crate::pipeline::decode_links;
use crate::transform::{apply_group_filters, drop_excluded_tags};

// Sub-modules
pub mod generator_config;
pub mod helpers;

// Re-exports
pub use generator_config::GeneratorConfig;
pub use helpers::expand_tilde;

// ============================================================================
// Generator
// ============================================================================

/// Generator that orchestrates the outbound generation process
pub struct Generator {
    config: GeneratorConfig,
    registry: Arc<ProtocolRegistry>,
}

impl Generator {
    /// Create a new generator with the given config
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            registry: Arc::new(ProtocolRegistry::with_builtin_parsers()),
        }
    }

    /// Load generator from a config file path
    pub async fn load(path: &str) -> Result<Self> {
        let config = GeneratorConfig::load(path).await?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run the generation process
    pub async fn generate(&self) -> Result<OutboundDocument> {
        info!("Starting outbound generation");

        // 1. Read the link list
        let links = self.read_links().await?;
        info!("Loaded {} links from {}", links.len(), self.config.links);

        // 2. Decode every link concurrently, then restore input order
        let batch = decode_links(Arc::clone(&self.registry), links).await;
        if batch.total > 0 && batch.success_count() == 0 {
            bail!("None of the {} links could be decoded", batch.total);
        }
        let nodes = batch.into_ordered_outbounds();

        // 3. Drop provider notice nodes
        let nodes = drop_excluded_tags(nodes, &self.config.exclude_tag_keywords);
        debug!("Node pool has {} outbounds", nodes.len());

        // 4. Resolve group members against the pool
        let mut outbounds = self.config.outbounds.clone();
        let fallback = self.config.empty_group_fallback();
        let fallback_count = apply_group_filters(&mut outbounds, &nodes, fallback);

        // 5. Make sure the empty-group fallback exists
        if fallback_count > 0
            && let Some(tag) = fallback
            && !outbounds.iter().chain(nodes.iter()).any(|o| o.tag() == tag)
        {
            info!("Adding block outbound '{}' for empty groups", tag);
            outbounds.push(Outbound::Block(BlockOutbound {
                tag: tag.to_string(),
            }));
        }

        // 6. Groups and static outbounds first, then nodes in input order
        outbounds.extend(nodes);
        let document = OutboundDocument::new(outbounds);
        info!(
            "Final document has {} outbounds ({} nodes)",
            document.outbounds.len(),
            document.node_count()
        );

        Ok(document)
    }

    /// Generate and write to output file
    pub async fn generate_to_file(&self, output_override: Option<&str>) -> Result<()> {
        let document = self.generate().await?;

        let validation_result = validate_outbounds(&document.outbounds);
        if !validation_result.is_ok() {
            warn!(
                "Document has {} validation error(s)",
                validation_result.error_count()
            );
            validation_result.log_errors();
        }

        let output_path = output_override.unwrap_or(&self.config.output);
        let expanded_path = expand_tilde(output_path);
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }

        let json = document
            .to_json_pretty()
            .context("Failed to serialize outbounds to JSON")?;

        tokio::fs::write(path, &json)
            .await
            .with_context(|| format!("Failed to write outbounds to {:?}", path))?;

        info!("Outbounds written to {:?}", path);
        Ok(())
    }

    /// Read the link list, skipping blank and comment lines
    async fn read_links(&self) -> Result<Vec<String>> {
        let expanded = expand_tilde(&self.config.links);
        let content = tokio::fs::read_to_string(&expanded)
            .await
            .with_context(|| format!("Failed to read link list from {}", expanded))?;
        Ok(split_link_lines(&content))
    }
}
