use std::fmt;

use serde::{Deserialize, Serialize};
use tt_feed::FeedFile;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Target,
    Agencies,
    Routes,
    Trips,
    StopTimes,
    Stops,
    Shapes,
    Associations,
    Statistics,
    StaleRoutes,
    FeedInfo,
}

impl Stage {
    pub const ORDER: [Stage; 11] = [
        Stage::Target,
        Stage::Agencies,
        Stage::Routes,
        Stage::Trips,
        Stage::StopTimes,
        Stage::Stops,
        Stage::Shapes,
        Stage::Associations,
        Stage::Statistics,
        Stage::StaleRoutes,
        Stage::FeedInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Target => "target",
            Stage::Agencies => "agencies",
            Stage::Routes => "routes",
            Stage::Trips => "trips",
            Stage::StopTimes => "stop_times",
            Stage::Stops => "stops",
            Stage::Shapes => "shapes",
            Stage::Associations => "associations",
            Stage::Statistics => "statistics",
            Stage::StaleRoutes => "stale_routes",
            Stage::FeedInfo => "feed_info",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional observer for long runs. Purely informational: the engine behaves
/// identically whatever the observer does.
pub trait ProgressObserver: Send + Sync {
    /// Called when `stage` starts.
    fn on_stage(&self, _stage: Stage) {}

    /// Called every `progress_every` rows read from `file`.
    fn on_progress(&self, _file: FeedFile, _rows_read: u64) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {}
