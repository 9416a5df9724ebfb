use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use tt_feed::FeedFile;
use uuid::Uuid;

/// Rows read and rows dropped as defects, per feed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    pub read: u64,
    pub skipped: u64,
}

/// Observable result of one run.
///
/// Counts are computed identically whether the run commits or is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub run_id: Uuid,
    pub region_id: Option<i32>,
    pub feed_id: Option<i32>,

    pub regions_created: u64,
    pub feeds_created: u64,
    pub agencies_inserted: u64,
    pub routes_inserted: u64,
    pub routes_updated: u64,
    pub routes_archived: u64,
    pub routes_deleted: u64,
    /// Shape points written.
    pub shapes_inserted: u64,
    pub trips_inserted: u64,
    pub stop_times_inserted: u64,
    pub stops_staged: u64,
    pub route_stop_counts_updated: u64,
    pub shape_lines_inserted: u64,
    pub route_shapes_inserted: u64,

    pub route_type_defaulted: u64,
    pub route_type_invalid: u64,

    pub rows: BTreeMap<FeedFile, RowCounts>,
    pub dry_run: bool,
}

impl ImportSummary {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            region_id: None,
            feed_id: None,
            regions_created: 0,
            feeds_created: 0,
            agencies_inserted: 0,
            routes_inserted: 0,
            routes_updated: 0,
            routes_archived: 0,
            routes_deleted: 0,
            shapes_inserted: 0,
            trips_inserted: 0,
            stop_times_inserted: 0,
            stops_staged: 0,
            route_stop_counts_updated: 0,
            shape_lines_inserted: 0,
            route_shapes_inserted: 0,
            route_type_defaulted: 0,
            route_type_invalid: 0,
            rows: BTreeMap::new(),
            dry_run: false,
        }
    }

    pub fn rows_for(&self, file: FeedFile) -> RowCounts {
        self.rows.get(&file).copied().unwrap_or_default()
    }

    pub(crate) fn row_read(&mut self, file: FeedFile) -> u64 {
        let c = self.rows.entry(file).or_default();
        c.read += 1;
        c.read
    }

    pub(crate) fn row_skipped(&mut self, file: FeedFile) {
        self.rows.entry(file).or_default().skipped += 1;
    }

    /// Ordered `(key, value)` pairs for line-oriented output.
    pub fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("regions_created", self.regions_created),
            ("feeds_created", self.feeds_created),
            ("agencies_inserted", self.agencies_inserted),
            ("routes_inserted", self.routes_inserted),
            ("routes_updated", self.routes_updated),
            ("routes_archived", self.routes_archived),
            ("routes_deleted", self.routes_deleted),
            ("shapes_inserted", self.shapes_inserted),
            ("trips_inserted", self.trips_inserted),
            ("stop_times_inserted", self.stop_times_inserted),
            ("stops_staged", self.stops_staged),
            ("route_stop_counts_updated", self.route_stop_counts_updated),
            ("shape_lines_inserted", self.shape_lines_inserted),
            ("route_shapes_inserted", self.route_shapes_inserted),
            ("route_type_defaulted", self.route_type_defaulted),
            ("route_type_invalid", self.route_type_invalid),
        ]
    }

    pub(crate) fn log(&self) {
        info!(
            run_id = %self.run_id,
            region_id = ?self.region_id,
            feed_id = ?self.feed_id,
            agencies_inserted = self.agencies_inserted,
            routes_inserted = self.routes_inserted,
            routes_updated = self.routes_updated,
            routes_archived = self.routes_archived,
            routes_deleted = self.routes_deleted,
            shapes_inserted = self.shapes_inserted,
            trips_inserted = self.trips_inserted,
            stop_times_inserted = self.stop_times_inserted,
            route_stop_counts_updated = self.route_stop_counts_updated,
            shape_lines_inserted = self.shape_lines_inserted,
            route_shapes_inserted = self.route_shapes_inserted,
            dry_run = self.dry_run,
            "import finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_counts_accumulate_per_file() {
        let mut s = ImportSummary::new(Uuid::nil());
        s.row_read(FeedFile::Routes);
        s.row_read(FeedFile::Routes);
        s.row_skipped(FeedFile::Routes);
        assert_eq!(
            s.rows_for(FeedFile::Routes),
            RowCounts {
                read: 2,
                skipped: 1
            }
        );
        assert_eq!(s.rows_for(FeedFile::Shapes), RowCounts::default());
    }

    #[test]
    fn serializes_files_by_snake_case_name() {
        let mut s = ImportSummary::new(Uuid::nil());
        s.row_read(FeedFile::StopTimes);
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["rows"]["stop_times"]["read"], 1);
        assert_eq!(v["dry_run"], false);
    }
}
