use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_URL_ENV: &str = "TT_DATABASE_URL";

const REPLACE_MODES: &[&str] = &["archive", "delete", "keep"];
const UPDATE_MODES: &[&str] = &["full", "routes"];
const SCOPES: &[&str] = &["unknown", "regional", "national", "international"];

/// Typed view of the effective config. Mode and scope values stay strings;
/// the caller maps them onto engine types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub region: RegionConfig,
    pub import: ImportSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Name of the env var holding the connection URL.
    pub url_env: String,
    pub max_connections: u32,
    pub statement_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: DEFAULT_URL_ENV.to_string(),
            max_connections: 2,
            statement_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub dir: Option<PathBuf>,
    pub id: Option<i32>,
    pub name: Option<String>,
    pub source_url: Option<String>,
    pub scope: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            dir: None,
            id: None,
            name: None,
            source_url: None,
            scope: "regional".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub id: Option<i32>,
    pub name: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    pub replace_mode: String,
    pub update_mode: String,
    pub dry_run: bool,
    pub batch_size: usize,
    /// Rows between two progress callbacks. 0 disables row progress.
    pub progress_every: u64,
    pub default_agency: Option<String>,
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            replace_mode: "archive".to_string(),
            update_mode: "full".to_string(),
            dry_run: false,
            batch_size: 1000,
            progress_every: 10_000,
            default_agency: None,
        }
    }
}

impl ImportConfig {
    pub fn from_json(v: &Value) -> Result<Self> {
        let cfg: ImportConfig =
            serde_json::from_value(v.clone()).context("CONFIG_INVALID: import config shape")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks that hold regardless of where the values came from. Call again
    /// after applying command-line overrides.
    ///
    /// An unknown replace mode is not an error here: the importer treats it
    /// as "leave stale routes alone" and warns.
    pub fn validate(&self) -> Result<()> {
        let update_mode = self.import.update_mode.trim().to_ascii_lowercase();
        if !UPDATE_MODES.contains(&update_mode.as_str()) {
            bail!(
                "CONFIG_INVALID: import.update_mode={:?} (expected one of {:?})",
                self.import.update_mode,
                UPDATE_MODES
            );
        }
        let scope = self.feed.scope.trim().to_ascii_lowercase();
        if !SCOPES.contains(&scope.as_str()) {
            bail!(
                "CONFIG_INVALID: feed.scope={:?} (expected one of {:?})",
                self.feed.scope,
                SCOPES
            );
        }
        if self.import.batch_size == 0 {
            bail!("CONFIG_INVALID: import.batch_size must be > 0");
        }
        if self.database.max_connections == 0 {
            bail!("CONFIG_INVALID: database.max_connections must be > 0");
        }
        if self.database.url_env.trim().is_empty() {
            bail!("CONFIG_INVALID: database.url_env is empty");
        }
        Ok(())
    }

    pub fn replace_mode_is_known(&self) -> bool {
        let m = self.import.replace_mode.trim().to_ascii_lowercase();
        REPLACE_MODES.contains(&m.as_str())
    }
}
