//! Outbound group resolution
//!
//! This module turns group declarations into concrete member lists:
//! - Dropping nodes whose tags mark them as provider notices
//! - Resolving the `{all}` placeholder against the node pool with
//!   include/exclude filter rules
//! - Falling back to a sentinel member when a group resolves empty

pub mod matcher;

use tracing::{debug, info, warn};

use crate::config::outbound::{FilterAction, FilterRule, Outbound};

pub use matcher::{is_regex_pattern, matches, matches_any};

/// Declared member list meaning "every node in the pool, filtered".
pub const ALL_NODES: &str = "{all}";

/// Tag keywords that mark provider notices (website, traffic quota) that
/// are shipped as fake nodes.
pub const DEFAULT_EXCLUDED_TAG_KEYWORDS: [&str; 2] = ["官网", "流量"];

// ============================================================================
// Node Pool Filtering
// ============================================================================

/// Drop nodes whose tag contains any of `keywords`.
pub fn drop_excluded_tags<S: AsRef<str>>(nodes: Vec<Outbound>, keywords: &[S]) -> Vec<Outbound> {
    if keywords.is_empty() {
        return nodes;
    }

    let original_count = nodes.len();
    let kept: Vec<Outbound> = nodes
        .into_iter()
        .filter(|node| {
            let tag = node.tag();
            let excluded = keywords.iter().any(|k| tag.contains(k.as_ref()));
            if excluded {
                debug!("Dropping notice node: {}", tag);
            }
            !excluded
        })
        .collect();

    let removed = original_count - kept.len();
    if removed > 0 {
        info!("Dropped {} nodes by tag keyword", removed);
    }
    kept
}

// ============================================================================
// Group Resolution
// ============================================================================

/// Whether `members` is exactly the `{all}` placeholder.
pub fn is_all_nodes(members: &[String]) -> bool {
    matches!(members, [only] if only == ALL_NODES)
}

/// Evaluates filter rules in order against a tag.
///
/// An exclude rule that matches, or an include rule that does not, rejects
/// the tag immediately.
pub fn passes_filters(tag: &str, rules: &[FilterRule]) -> bool {
    rules.iter().all(|rule| {
        let matched = matches_any(tag, &rule.patterns);
        match rule.action {
            FilterAction::Include => matched,
            FilterAction::Exclude => !matched,
        }
    })
}

/// Computes the member tags of a group.
///
/// When `declared` is the `{all}` placeholder, every tag in `pool` that
/// passes `rules` is returned in pool order. Any other declared list is
/// returned unchanged and `rules` are not consulted.
pub fn resolve_group_members(
    pool: &[Outbound],
    declared: &[String],
    rules: &[FilterRule],
) -> Vec<String> {
    if !is_all_nodes(declared) {
        return declared.to_vec();
    }

    pool.iter()
        .map(Outbound::tag)
        .filter(|tag| passes_filters(tag, rules))
        .map(str::to_string)
        .collect()
}

/// Resolves every Selector and URLTest in `outbounds` in place.
///
/// Each group's filter rules are consumed. A group that resolves to no
/// members gets `[empty_fallback]` when one is given. Returns the number of
/// groups that needed the fallback.
pub fn apply_group_filters(
    outbounds: &mut [Outbound],
    pool: &[Outbound],
    empty_fallback: Option<&str>,
) -> usize {
    let mut fallback_count = 0;

    for outbound in outbounds.iter_mut() {
        let (tag, members, filter) = match outbound {
            Outbound::Selector(o) => (&o.tag, &mut o.outbounds, &mut o.filter),
            Outbound::UrlTest(o) => (&o.tag, &mut o.outbounds, &mut o.filter),
            _ => continue,
        };

        let rules = std::mem::take(filter);
        let resolved = resolve_group_members(pool, members, &rules);
        debug!(
            "Resolved group '{}' with {} rules -> {} members",
            tag,
            rules.len(),
            resolved.len()
        );
        *members = resolved;

        if members.is_empty() {
            match empty_fallback {
                Some(fallback) => {
                    warn!("Group '{}' has no members, using '{}'", tag, fallback);
                    members.push(fallback.to_string());
                    fallback_count += 1;
                }
                None => warn!("Group '{}' has no members", tag),
            }
        }
    }

    fallback_count
}

// ============================================================================
// Tests
// ============================================================================
