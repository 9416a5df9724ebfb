use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ImportError;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_PROGRESS_EVERY: u64 = 10_000;

/// Returned by the strict `FromStr` impls below.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} `{value}` (expected one of: {expected})")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// How much of the feed a run reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Every entity in the snapshot; shapes replaced wholesale.
    #[default]
    Full,
    /// Only newly introduced routes and the shapes their trips reach.
    Routes,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Full => "full",
            UpdateMode::Routes => "routes",
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, UpdateMode::Full)
    }
}

impl FromStr for UpdateMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(UpdateMode::Full),
            "routes" => Ok(UpdateMode::Routes),
            _ => Err(UnknownVariant {
                kind: "update mode",
                value: s.to_string(),
                expected: "full, routes",
            }),
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disposition of routes persisted for the feed but absent from this run.
///
/// Parsing never fails: an unrecognised value is kept verbatim and resolves
/// to a no-op at the stale-route stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplaceMode {
    #[default]
    Archive,
    Delete,
    Keep,
    Unrecognized(String),
}

impl ReplaceMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "archive" => ReplaceMode::Archive,
            "delete" => ReplaceMode::Delete,
            "keep" => ReplaceMode::Keep,
            _ => ReplaceMode::Unrecognized(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReplaceMode::Archive => "archive",
            ReplaceMode::Delete => "delete",
            ReplaceMode::Keep => "keep",
            ReplaceMode::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for ReplaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coverage of a region or feed. Stored as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataScope {
    Unknown,
    #[default]
    Regional,
    National,
    International,
}

impl DataScope {
    pub fn code(&self) -> i32 {
        match self {
            DataScope::Unknown => 0,
            DataScope::Regional => 1,
            DataScope::National => 2,
            DataScope::International => 3,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => DataScope::Regional,
            2 => DataScope::National,
            3 => DataScope::International,
            _ => DataScope::Unknown,
        }
    }
}

impl FromStr for DataScope {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(DataScope::Unknown),
            "regional" => Ok(DataScope::Regional),
            "national" => Ok(DataScope::National),
            "international" => Ok(DataScope::International),
            _ => Err(UnknownVariant {
                kind: "scope",
                value: s.to_string(),
                expected: "regional, national, international, unknown",
            }),
        }
    }
}

/// Region a run imports into: reuse by id, or look up / create by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionTarget {
    Id(i32),
    Named { name: String, country_code: String },
}

impl RegionTarget {
    /// Id wins when both forms are present.
    pub fn from_parts(
        id: Option<i32>,
        name: Option<String>,
        country_code: Option<String>,
    ) -> Result<Self, ImportError> {
        match (id, name, country_code) {
            (Some(id), _, _) => Ok(RegionTarget::Id(id)),
            (None, Some(name), Some(country_code)) => Ok(RegionTarget::Named {
                name,
                country_code: country_code.to_ascii_uppercase(),
            }),
            _ => Err(ImportError::MissingFeedTarget(
                "region needs an id, or a name and a country code".to_string(),
            )),
        }
    }
}

/// Feed a run reconciles: reuse by id, or look up / create by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedTarget {
    Id(i32),
    Named {
        name: String,
        source_url: Option<String>,
    },
}

impl FeedTarget {
    pub fn from_parts(
        id: Option<i32>,
        name: Option<String>,
        source_url: Option<String>,
    ) -> Result<Self, ImportError> {
        match (id, name) {
            (Some(id), _) => Ok(FeedTarget::Id(id)),
            (None, Some(name)) => Ok(FeedTarget::Named { name, source_url }),
            (None, None) => Err(ImportError::MissingFeedTarget(
                "feed needs an id or a name".to_string(),
            )),
        }
    }
}

/// Everything the engine needs to know about one run.
///
/// Dry runs are expressed by [`TxOutcome`], not by a flag here.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub region: RegionTarget,
    pub feed: FeedTarget,
    pub scope: DataScope,
    pub replace_mode: ReplaceMode,
    pub update_mode: UpdateMode,
    /// Shape points buffered before a bulk insert.
    pub batch_size: usize,
    /// Rows between two progress callbacks. 0 disables row progress.
    pub progress_every: u64,
    /// Feed-native agency id (or name) used for routes whose agency does not
    /// resolve. Defaults to the first agency read.
    pub default_agency: Option<String>,
}

impl ImportOptions {
    pub fn new(region: RegionTarget, feed: FeedTarget) -> Self {
        Self {
            region,
            feed,
            scope: DataScope::default(),
            replace_mode: ReplaceMode::default(),
            update_mode: UpdateMode::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            progress_every: DEFAULT_PROGRESS_EVERY,
            default_agency: None,
        }
    }
}

/// What the transaction boundary does once the engine has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Commit,
    Discard,
}

impl TxOutcome {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            TxOutcome::Discard
        } else {
            TxOutcome::Commit
        }
    }
}

/// Lat/lon bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    pub fn point(lat: f64, lon: f64) -> Self {
        Self {
            min_lat: lat,
            min_lon: lon,
            max_lat: lat,
            max_lon: lon,
        }
    }

    pub fn include(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lat = self.max_lat.max(lat);
        self.max_lon = self.max_lon.max(lon);
    }

    pub fn union(mut self, other: &Bounds) -> Self {
        self.include(other.min_lat, other.min_lon);
        self.include(other.max_lat, other.max_lon);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_mode_is_strict() {
        assert_eq!("FULL".parse::<UpdateMode>().unwrap(), UpdateMode::Full);
        assert_eq!("routes".parse::<UpdateMode>().unwrap(), UpdateMode::Routes);
        let err = "partial".parse::<UpdateMode>().unwrap_err();
        assert_eq!(err.value, "partial");
    }

    #[test]
    fn replace_mode_is_lenient() {
        assert_eq!(ReplaceMode::parse("Delete"), ReplaceMode::Delete);
        assert_eq!(
            ReplaceMode::parse("purge"),
            ReplaceMode::Unrecognized("purge".to_string())
        );
        assert_eq!(ReplaceMode::parse("purge").as_str(), "purge");
    }

    #[test]
    fn scope_codes_round_trip_through_store_encoding() {
        for scope in [
            DataScope::Unknown,
            DataScope::Regional,
            DataScope::National,
            DataScope::International,
        ] {
            assert_eq!(DataScope::from_code(scope.code()), scope);
        }
        assert_eq!(DataScope::from_code(42), DataScope::Unknown);
    }

    #[test]
    fn region_target_requires_id_or_name_and_country() {
        assert_eq!(
            RegionTarget::from_parts(Some(4), None, None).unwrap(),
            RegionTarget::Id(4)
        );
        assert_eq!(
            RegionTarget::from_parts(None, Some("Stockholm".into()), Some("se".into())).unwrap(),
            RegionTarget::Named {
                name: "Stockholm".into(),
                country_code: "SE".into()
            }
        );
        assert!(matches!(
            RegionTarget::from_parts(None, Some("Stockholm".into()), None),
            Err(ImportError::MissingFeedTarget(_))
        ));
    }

    #[test]
    fn bounds_only_grow() {
        let mut b = Bounds::point(59.3, 18.0);
        b.include(59.4, 17.9);
        b.include(59.35, 18.0);
        assert_eq!(b.min_lat, 59.3);
        assert_eq!(b.max_lat, 59.4);
        assert_eq!(b.min_lon, 17.9);
        assert_eq!(b.max_lon, 18.0);

        let wider = b.union(&Bounds::point(60.0, 19.0));
        assert_eq!(wider.max_lat, 60.0);
        assert_eq!(wider.min_lat, 59.3);
    }
}
