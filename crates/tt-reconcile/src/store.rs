//! Persistence boundary.
//!
//! One [`FeedStore`] value is one open transaction. Every write of a run goes
//! through it; nothing becomes visible until [`StoreTransaction::commit`].

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tt_feed::RouteTypeValue;

use crate::types::{Bounds, DataScope};

/// Result of a look-up-or-insert by natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub id: i32,
    pub inserted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegion {
    pub name: String,
    pub country_code: String,
    pub scope: DataScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRow {
    pub id: i32,
    pub name: String,
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeed {
    pub region_id: i32,
    pub name: String,
    pub source_url: Option<String>,
    pub scope: DataScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRow {
    pub id: i32,
    pub region_id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAgency {
    pub name: String,
    pub country_code: String,
    pub url: Option<String>,
    pub timezone: Option<String>,
}

/// Mutable route attributes, keyed by `(feed_id, gtfs_route_id)`.
///
/// On insert the route type is `route_type.for_insert()`; on update it is
/// `route_type.for_update()`, where `None` keeps the stored value. Either way
/// the route ends up active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteUpsert {
    pub feed_id: i32,
    pub gtfs_route_id: String,
    pub agency_id: i32,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub route_type: RouteTypeValue,
    pub color: Option<String>,
    pub text_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapePoint {
    pub gtfs_shape_id: String,
    pub sequence: i32,
    pub lat: f64,
    pub lon: f64,
}

#[async_trait]
pub trait FeedStore: Send {
    // --- region / feed ---
    async fn find_region(&mut self, region_id: i32) -> Result<Option<RegionRow>>;
    /// Look up by `(country_code, name)`, inserting when absent.
    async fn ensure_region(&mut self, region: &NewRegion) -> Result<Upserted>;
    /// Grow the stored extent to cover `bounds`. Never shrinks it.
    async fn widen_region_bounds(&mut self, region_id: i32, bounds: &Bounds) -> Result<()>;

    async fn find_feed(&mut self, feed_id: i32) -> Result<Option<FeedRow>>;
    /// Look up by `(region_id, name)`, inserting when absent.
    async fn ensure_feed(&mut self, feed: &NewFeed) -> Result<Upserted>;
    /// Stamp the feed after a successful run and force it active.
    async fn mark_feed_imported(
        &mut self,
        feed_id: i32,
        version: Option<&str>,
        imported_at: DateTime<Utc>,
    ) -> Result<()>;

    // --- agencies / routes ---
    /// Look up by `(name, country_code)`, inserting when absent.
    async fn ensure_agency(&mut self, agency: &NewAgency) -> Result<Upserted>;
    async fn upsert_route(&mut self, route: &RouteUpsert) -> Result<Upserted>;

    // --- shapes ---
    /// Subset of `ids` that already has points stored.
    async fn existing_shape_ids(&mut self, ids: &[String]) -> Result<HashSet<String>>;
    /// Remove the points and the line of every id in `ids`.
    async fn delete_shapes(&mut self, ids: &[String]) -> Result<u64>;
    async fn insert_shape_points(&mut self, points: &[ShapePoint]) -> Result<u64>;
    /// Build one line per id from its points ordered by sequence. Ids that
    /// already have a line, or fewer than two points, are skipped.
    async fn insert_shape_lines(&mut self, ids: &[String]) -> Result<u64>;

    // --- associations ---
    async fn clear_route_shapes(&mut self, route_ids: &[i32]) -> Result<u64>;
    /// Insert `(route_id, gtfs_shape_id)` pairs, keeping only active routes of
    /// `feed_id`. Existing pairs are ignored.
    async fn insert_route_shapes(&mut self, feed_id: i32, pairs: &[(i32, String)]) -> Result<u64>;

    // --- derived statistics ---
    /// Overwrite `stop_count` per `(route_id, count)`. Returns how many
    /// routes actually changed value.
    async fn update_stop_counts(&mut self, counts: &[(i32, i32)]) -> Result<u64>;
    /// Set `longest_trip_length_m` to the longest associated shape line, for
    /// every route of the feed or only `route_ids` when given.
    async fn update_longest_trip_lengths(
        &mut self,
        feed_id: i32,
        route_ids: Option<&[i32]>,
    ) -> Result<u64>;
    /// Clear `longest_trip_length_m` on routes of the feed with no associated shape line.
    async fn clear_longest_trip_lengths_without_shapes(&mut self, feed_id: i32) -> Result<u64>;

    // --- stale routes ---
    async fn set_routes_active(&mut self, route_ids: &[i32]) -> Result<u64>;
    /// Deactivate active routes of the feed not in `keep`. Returns newly
    /// deactivated count.
    async fn deactivate_routes_except(&mut self, feed_id: i32, keep: &[i32]) -> Result<u64>;
    /// Delete associations then rows of routes of the feed not in `keep`.
    async fn delete_routes_except(&mut self, feed_id: i32, keep: &[i32]) -> Result<u64>;
}

/// A [`FeedStore`] that can be finished exactly once.
#[async_trait]
pub trait StoreTransaction: FeedStore + Sized {
    async fn commit(self) -> Result<()>;
    async fn rollback(self) -> Result<()>;
}
