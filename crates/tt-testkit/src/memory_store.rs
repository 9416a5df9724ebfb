use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tt_reconcile::{
    Bounds, DataScope, FeedRow, FeedStore, NewAgency, NewFeed, NewRegion, RegionRow, RouteUpsert,
    ShapePoint, StoreTransaction, Upserted,
};

use crate::geometry::haversine_m;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRegion {
    pub id: i32,
    pub name: String,
    pub country_code: String,
    pub scope: DataScope,
    pub bounds: Option<Bounds>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFeed {
    pub id: i32,
    pub region_id: i32,
    pub name: String,
    pub source_url: Option<String>,
    pub scope: DataScope,
    pub version: Option<String>,
    pub imported_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredAgency {
    pub id: i32,
    pub name: String,
    pub country_code: String,
    pub url: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRoute {
    pub id: i32,
    pub feed_id: i32,
    pub agency_id: i32,
    pub gtfs_route_id: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub route_type: i32,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub is_active: bool,
    pub stop_count: Option<i32>,
    pub longest_trip_length_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredShapePoint {
    pub id: i32,
    pub gtfs_shape_id: String,
    pub sequence: i32,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredShapeLine {
    /// `(lat, lon)` in sequence order.
    pub points: Vec<(f64, f64)>,
    pub length_m: f64,
}

/// Whole queryable state of the in-memory store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryState {
    pub regions: BTreeMap<i32, StoredRegion>,
    pub feeds: BTreeMap<i32, StoredFeed>,
    pub agencies: BTreeMap<i32, StoredAgency>,
    pub routes: BTreeMap<i32, StoredRoute>,
    pub shape_points: Vec<StoredShapePoint>,
    pub shape_lines: BTreeMap<String, StoredShapeLine>,
    pub route_shapes: BTreeSet<(i32, String)>,
    next_id: i32,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn route(&self, feed_id: i32, gtfs_route_id: &str) -> Option<&StoredRoute> {
        self.routes
            .values()
            .find(|r| r.feed_id == feed_id && r.gtfs_route_id == gtfs_route_id)
    }

    /// `(sequence, lat, lon)` of a shape, in stored order.
    pub fn shape(&self, gtfs_shape_id: &str) -> Vec<(i32, f64, f64)> {
        let mut pts: Vec<&StoredShapePoint> = self
            .shape_points
            .iter()
            .filter(|p| p.gtfs_shape_id == gtfs_shape_id)
            .collect();
        pts.sort_by_key(|p| (p.sequence, p.id));
        pts.into_iter().map(|p| (p.sequence, p.lat, p.lon)).collect()
    }

    /// Shape ids linked to a route.
    pub fn shapes_of(&self, route_id: i32) -> Vec<&str> {
        self.route_shapes
            .iter()
            .filter(|(r, _)| *r == route_id)
            .map(|(_, s)| s.as_str())
            .collect()
    }
}

/// Shared in-memory store. Each [`MemoryStore::begin`] hands out a
/// transaction working on a private copy; only `commit` publishes it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_on: Arc<Mutex<Option<&'static str>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> MemoryTx {
        MemoryTx {
            working: self.snapshot(),
            shared: Arc::clone(&self.state),
            fail_on: *self.fail_on.lock().unwrap_or_else(|p| p.into_inner()),
        }
    }

    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Make the named store operation fail in transactions begun afterwards.
    /// `None` clears it.
    pub fn fail_on(&self, op: Option<&'static str>) {
        *self.fail_on.lock().unwrap_or_else(|p| p.into_inner()) = op;
    }
}

#[derive(Debug)]
pub struct MemoryTx {
    working: MemoryState,
    shared: Arc<Mutex<MemoryState>>,
    fail_on: Option<&'static str>,
}

impl MemoryTx {
    fn check(&self, op: &'static str) -> Result<()> {
        if self.fail_on == Some(op) {
            return Err(anyhow!("injected failure").context(format!("{op} failed")));
        }
        Ok(())
    }

    pub fn state(&self) -> &MemoryState {
        &self.working
    }
}

#[async_trait]
impl FeedStore for MemoryTx {
    async fn find_region(&mut self, region_id: i32) -> Result<Option<RegionRow>> {
        self.check("find_region")?;
        Ok(self.working.regions.get(&region_id).map(|r| RegionRow {
            id: r.id,
            name: r.name.clone(),
            country_code: r.country_code.clone(),
        }))
    }

    async fn ensure_region(&mut self, region: &NewRegion) -> Result<Upserted> {
        self.check("ensure_region")?;
        let st = &mut self.working;
        if let Some(r) = st
            .regions
            .values()
            .find(|r| r.country_code == region.country_code && r.name == region.name)
        {
            return Ok(Upserted {
                id: r.id,
                inserted: false,
            });
        }
        let id = st.next_id();
        st.regions.insert(
            id,
            StoredRegion {
                id,
                name: region.name.clone(),
                country_code: region.country_code.clone(),
                scope: region.scope,
                bounds: None,
            },
        );
        Ok(Upserted { id, inserted: true })
    }

    async fn widen_region_bounds(&mut self, region_id: i32, bounds: &Bounds) -> Result<()> {
        self.check("widen_region_bounds")?;
        if let Some(r) = self.working.regions.get_mut(&region_id) {
            r.bounds = Some(match r.bounds {
                Some(b) => b.union(bounds),
                None => *bounds,
            });
        }
        Ok(())
    }

    async fn find_feed(&mut self, feed_id: i32) -> Result<Option<FeedRow>> {
        self.check("find_feed")?;
        Ok(self.working.feeds.get(&feed_id).map(|f| FeedRow {
            id: f.id,
            region_id: f.region_id,
            name: f.name.clone(),
        }))
    }

    async fn ensure_feed(&mut self, feed: &NewFeed) -> Result<Upserted> {
        self.check("ensure_feed")?;
        let st = &mut self.working;
        if let Some(f) = st
            .feeds
            .values()
            .find(|f| f.region_id == feed.region_id && f.name == feed.name)
        {
            return Ok(Upserted {
                id: f.id,
                inserted: false,
            });
        }
        let id = st.next_id();
        st.feeds.insert(
            id,
            StoredFeed {
                id,
                region_id: feed.region_id,
                name: feed.name.clone(),
                source_url: feed.source_url.clone(),
                scope: feed.scope,
                version: None,
                imported_at: None,
                is_active: true,
            },
        );
        Ok(Upserted { id, inserted: true })
    }

    async fn mark_feed_imported(
        &mut self,
        feed_id: i32,
        version: Option<&str>,
        imported_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check("mark_feed_imported")?;
        let f = self
            .working
            .feeds
            .get_mut(&feed_id)
            .ok_or_else(|| anyhow!("mark_feed_imported failed: feed {feed_id} missing"))?;
        if let Some(v) = version {
            f.version = Some(v.to_string());
        }
        f.imported_at = Some(imported_at);
        f.is_active = true;
        Ok(())
    }

    async fn ensure_agency(&mut self, agency: &NewAgency) -> Result<Upserted> {
        self.check("ensure_agency")?;
        let st = &mut self.working;
        if let Some(a) = st
            .agencies
            .values()
            .find(|a| a.name == agency.name && a.country_code == agency.country_code)
        {
            return Ok(Upserted {
                id: a.id,
                inserted: false,
            });
        }
        let id = st.next_id();
        st.agencies.insert(
            id,
            StoredAgency {
                id,
                name: agency.name.clone(),
                country_code: agency.country_code.clone(),
                url: agency.url.clone(),
                timezone: agency.timezone.clone(),
            },
        );
        Ok(Upserted { id, inserted: true })
    }

    async fn upsert_route(&mut self, route: &RouteUpsert) -> Result<Upserted> {
        self.check("upsert_route")?;
        let st = &mut self.working;
        if let Some(r) = st
            .routes
            .values_mut()
            .find(|r| r.feed_id == route.feed_id && r.gtfs_route_id == route.gtfs_route_id)
        {
            r.agency_id = route.agency_id;
            r.short_name = route.short_name.clone();
            r.long_name = route.long_name.clone();
            if let Some(t) = route.route_type.for_update() {
                r.route_type = t;
            }
            r.color = route.color.clone();
            r.text_color = route.text_color.clone();
            r.is_active = true;
            return Ok(Upserted {
                id: r.id,
                inserted: false,
            });
        }
        let id = st.next_id();
        st.routes.insert(
            id,
            StoredRoute {
                id,
                feed_id: route.feed_id,
                agency_id: route.agency_id,
                gtfs_route_id: route.gtfs_route_id.clone(),
                short_name: route.short_name.clone(),
                long_name: route.long_name.clone(),
                route_type: route.route_type.for_insert(),
                color: route.color.clone(),
                text_color: route.text_color.clone(),
                is_active: true,
                stop_count: None,
                longest_trip_length_m: None,
            },
        );
        Ok(Upserted { id, inserted: true })
    }

    async fn existing_shape_ids(&mut self, ids: &[String]) -> Result<HashSet<String>> {
        self.check("existing_shape_ids")?;
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(self
            .working
            .shape_points
            .iter()
            .filter(|p| wanted.contains(p.gtfs_shape_id.as_str()))
            .map(|p| p.gtfs_shape_id.clone())
            .collect())
    }

    async fn delete_shapes(&mut self, ids: &[String]) -> Result<u64> {
        self.check("delete_shapes")?;
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let st = &mut self.working;
        let before = st.shape_points.len();
        st.shape_points
            .retain(|p| !doomed.contains(p.gtfs_shape_id.as_str()));
        st.shape_lines.retain(|id, _| !doomed.contains(id.as_str()));
        Ok((before - st.shape_points.len()) as u64)
    }

    async fn insert_shape_points(&mut self, points: &[ShapePoint]) -> Result<u64> {
        self.check("insert_shape_points")?;
        let st = &mut self.working;
        for p in points {
            let id = st.next_id();
            st.shape_points.push(StoredShapePoint {
                id,
                gtfs_shape_id: p.gtfs_shape_id.clone(),
                sequence: p.sequence,
                lat: p.lat,
                lon: p.lon,
            });
        }
        Ok(points.len() as u64)
    }

    async fn insert_shape_lines(&mut self, ids: &[String]) -> Result<u64> {
        self.check("insert_shape_lines")?;
        let mut n = 0;
        for id in ids {
            if self.working.shape_lines.contains_key(id) {
                continue;
            }
            let points: Vec<(f64, f64)> = self
                .working
                .shape(id)
                .into_iter()
                .map(|(_, lat, lon)| (lat, lon))
                .collect();
            if points.len() < 2 {
                continue;
            }
            let length_m = haversine_m(&points);
            self.working
                .shape_lines
                .insert(id.clone(), StoredShapeLine { points, length_m });
            n += 1;
        }
        Ok(n)
    }

    async fn clear_route_shapes(&mut self, route_ids: &[i32]) -> Result<u64> {
        self.check("clear_route_shapes")?;
        let before = self.working.route_shapes.len();
        self.working
            .route_shapes
            .retain(|(r, _)| !route_ids.contains(r));
        Ok((before - self.working.route_shapes.len()) as u64)
    }

    async fn insert_route_shapes(&mut self, feed_id: i32, pairs: &[(i32, String)]) -> Result<u64> {
        self.check("insert_route_shapes")?;
        let st = &mut self.working;
        let mut n = 0;
        for (route_id, shape_id) in pairs {
            let eligible = st
                .routes
                .get(route_id)
                .map(|r| r.feed_id == feed_id && r.is_active)
                .unwrap_or(false);
            if eligible && st.route_shapes.insert((*route_id, shape_id.clone())) {
                n += 1;
            }
        }
        Ok(n)
    }

    async fn update_stop_counts(&mut self, counts: &[(i32, i32)]) -> Result<u64> {
        self.check("update_stop_counts")?;
        let mut changed = 0;
        for (route_id, count) in counts {
            if let Some(r) = self.working.routes.get_mut(route_id) {
                if r.stop_count != Some(*count) {
                    r.stop_count = Some(*count);
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn update_longest_trip_lengths(
        &mut self,
        feed_id: i32,
        route_ids: Option<&[i32]>,
    ) -> Result<u64> {
        self.check("update_longest_trip_lengths")?;
        let st = &mut self.working;
        let mut longest: BTreeMap<i32, f64> = BTreeMap::new();
        for (route_id, shape_id) in &st.route_shapes {
            if let Some(line) = st.shape_lines.get(shape_id) {
                let e = longest.entry(*route_id).or_insert(line.length_m);
                *e = e.max(line.length_m);
            }
        }

        let mut n = 0;
        for r in st.routes.values_mut() {
            if r.feed_id != feed_id {
                continue;
            }
            if let Some(ids) = route_ids {
                if !ids.contains(&r.id) {
                    continue;
                }
            }
            if let Some(len) = longest.get(&r.id) {
                r.longest_trip_length_m = Some(*len);
                n += 1;
            }
        }
        Ok(n)
    }

    async fn clear_longest_trip_lengths_without_shapes(&mut self, feed_id: i32) -> Result<u64> {
        self.check("clear_longest_trip_lengths_without_shapes")?;
        let st = &mut self.working;
        // a route counts as linked only through an association whose shape has a line
        let linked: HashSet<i32> = st
            .route_shapes
            .iter()
            .filter(|(_, shape)| st.shape_lines.contains_key(shape))
            .map(|(r, _)| *r)
            .collect();
        let mut n = 0;
        for r in st.routes.values_mut() {
            if r.feed_id == feed_id && r.longest_trip_length_m.is_some() && !linked.contains(&r.id)
            {
                r.longest_trip_length_m = None;
                n += 1;
            }
        }
        Ok(n)
    }

    async fn set_routes_active(&mut self, route_ids: &[i32]) -> Result<u64> {
        self.check("set_routes_active")?;
        let mut n = 0;
        for id in route_ids {
            if let Some(r) = self.working.routes.get_mut(id) {
                if !r.is_active {
                    r.is_active = true;
                    n += 1;
                }
            }
        }
        Ok(n)
    }

    async fn deactivate_routes_except(&mut self, feed_id: i32, keep: &[i32]) -> Result<u64> {
        self.check("deactivate_routes_except")?;
        let mut n = 0;
        for r in self.working.routes.values_mut() {
            if r.feed_id == feed_id && r.is_active && !keep.contains(&r.id) {
                r.is_active = false;
                n += 1;
            }
        }
        Ok(n)
    }

    async fn delete_routes_except(&mut self, feed_id: i32, keep: &[i32]) -> Result<u64> {
        self.check("delete_routes_except")?;
        let st = &mut self.working;
        let doomed: HashSet<i32> = st
            .routes
            .values()
            .filter(|r| r.feed_id == feed_id && !keep.contains(&r.id))
            .map(|r| r.id)
            .collect();
        st.route_shapes.retain(|(r, _)| !doomed.contains(r));
        st.routes.retain(|id, _| !doomed.contains(id));
        Ok(doomed.len() as u64)
    }
}

#[async_trait]
impl StoreTransaction for MemoryTx {
    async fn commit(self) -> Result<()> {
        self.check("commit")?;
        let mut shared = self
            .shared
            .lock()
            .map_err(|_| anyhow!("commit failed: memory store lock poisoned"))?;
        *shared = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.check("rollback")?;
        Ok(())
    }
}
