//! Unused-key guard.
//!
//! A leaf is consumed when it sits under one of the JSON-pointer prefixes the
//! importer actually reads. Anything else is most likely a typo
//! (`import.dryrun`) and is reported.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collect_leaf_pointers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub consumed_prefixes: Vec<String>,
    /// Sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Keys read by [`crate::ImportConfig::from_json`].
pub fn consumed_pointers() -> &'static [&'static str] {
    &[
        "/database/url_env",
        "/database/max_connections",
        "/database/statement_timeout_secs",
        "/feed/dir",
        "/feed/id",
        "/feed/name",
        "/feed/source_url",
        "/feed/scope",
        "/region/id",
        "/region/name",
        "/region/country_code",
        "/import/replace_mode",
        "/import/update_mode",
        "/import/dry_run",
        "/import/batch_size",
        "/import/progress_every",
        "/import/default_agency",
    ]
}

pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed_prefixes: Vec<String> = consumed_pointers().iter().map(|p| p.to_string()).collect();

    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        // "/" is the empty-document leaf
        .filter(|leaf| leaf != "/")
        .filter(|leaf| !consumed_prefixes.iter().any(|p| is_prefix_pointer(p, leaf)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected: {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers
        );
    }

    Ok(report)
}

/// "/a/b" covers "/a/b" and "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    match leaf.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_respects_token_boundary() {
        assert!(is_prefix_pointer("/feed/name", "/feed/name"));
        assert!(is_prefix_pointer("/feed", "/feed/name"));
        assert!(!is_prefix_pointer("/feed/name", "/feed/names"));
    }
}
