//! Per-run staging structures.
//!
//! Everything here lives for exactly one run inside the engine's run context
//! and is passed explicitly between stages.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use tt_feed::StopRecord;

/// Ids present in the current snapshot ("seen") and the subset that did not
/// exist in the store when the run started ("new").
#[derive(Debug, Clone)]
pub struct StagingSet<K: Ord> {
    seen: BTreeSet<K>,
    new: BTreeSet<K>,
}

impl<K: Ord> Default for StagingSet<K> {
    fn default() -> Self {
        Self {
            seen: BTreeSet::new(),
            new: BTreeSet::new(),
        }
    }
}

impl<K: Ord + Clone> StagingSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as present. Returns `true` on first sighting.
    pub fn mark(&mut self, id: K) -> bool {
        self.seen.insert(id)
    }

    /// Record `id` as present and previously absent from the store.
    pub fn mark_new(&mut self, id: K) {
        self.seen.insert(id.clone());
        self.new.insert(id);
    }

    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.seen.contains(id)
    }

    pub fn is_new<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.new.contains(id)
    }

    pub fn seen(&self) -> &BTreeSet<K> {
        &self.seen
    }

    pub fn new_ids(&self) -> &BTreeSet<K> {
        &self.new
    }
}

/// Route staging: feed-native ids plus their store ids.
#[derive(Debug, Clone, Default)]
pub struct RouteStaging {
    set: StagingSet<String>,
    db_ids: BTreeMap<String, i32>,
}

impl RouteStaging {
    pub fn record(&mut self, gtfs_route_id: &str, db_id: i32, inserted: bool) {
        if inserted {
            self.set.mark_new(gtfs_route_id.to_string());
        } else {
            self.set.mark(gtfs_route_id.to_string());
        }
        self.db_ids.insert(gtfs_route_id.to_string(), db_id);
    }

    pub fn contains(&self, gtfs_route_id: &str) -> bool {
        self.set.contains(gtfs_route_id)
    }

    pub fn is_new(&self, gtfs_route_id: &str) -> bool {
        self.set.is_new(gtfs_route_id)
    }

    pub fn db_id(&self, gtfs_route_id: &str) -> Option<i32> {
        self.db_ids.get(gtfs_route_id).copied()
    }

    /// Store ids of every route seen this run, ascending.
    pub fn seen_db_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.db_ids.values().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Store ids of routes inserted this run, ascending.
    pub fn new_db_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .set
            .new_ids()
            .iter()
            .filter_map(|g| self.db_ids.get(g).copied())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn seen_len(&self) -> usize {
        self.set.seen().len()
    }
}

/// Staged trips: trip id -> (route id, shape id). First occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct TripStaging {
    trips: BTreeMap<String, (String, String)>,
}

impl TripStaging {
    /// Returns `false` if `trip_id` was already staged.
    pub fn insert(&mut self, trip_id: String, route_id: String, shape_id: String) -> bool {
        if self.trips.contains_key(&trip_id) {
            return false;
        }
        self.trips.insert(trip_id, (route_id, shape_id));
        true
    }

    pub fn contains(&self, trip_id: &str) -> bool {
        self.trips.contains_key(trip_id)
    }

    pub fn route_of(&self, trip_id: &str) -> Option<&str> {
        self.trips.get(trip_id).map(|(r, _)| r.as_str())
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Shape ids reachable from staged trips. Used as the shape filter in
    /// routes mode.
    pub fn shape_ids(&self) -> BTreeSet<String> {
        self.trips.values().map(|(_, s)| s.clone()).collect()
    }

    pub fn route_ids(&self) -> BTreeSet<&str> {
        self.trips.values().map(|(r, _)| r.as_str()).collect()
    }

    /// Distinct `(route id, shape id)` pairs implied by staged trips.
    pub fn route_shape_pairs(&self) -> BTreeSet<(&str, &str)> {
        self.trips
            .values()
            .map(|(r, s)| (r.as_str(), s.as_str()))
            .collect()
    }
}

/// Staged stop-times and stop parents, for distinct-stop counting.
#[derive(Debug, Clone, Default)]
pub struct StopStaging {
    by_trip: BTreeMap<String, BTreeSet<String>>,
    parents: HashMap<String, String>,
}

impl StopStaging {
    pub fn add_stop_time(&mut self, trip_id: String, stop_id: String) {
        self.by_trip.entry(trip_id).or_default().insert(stop_id);
    }

    pub fn add_stop(&mut self, stop: &StopRecord) {
        if let Some(parent) = &stop.parent_station {
            self.parents.insert(stop.stop_id.clone(), parent.clone());
        }
    }

    fn logical<'a>(&'a self, stop_id: &'a str) -> &'a str {
        self.parents.get(stop_id).map(String::as_str).unwrap_or(stop_id)
    }

    /// Distinct logical stops per route, over every route that has a staged
    /// trip. Routes with no stop-times get 0.
    pub fn stop_counts(&self, trips: &TripStaging) -> BTreeMap<String, usize> {
        let mut per_route: BTreeMap<&str, BTreeSet<&str>> = trips
            .route_ids()
            .into_iter()
            .map(|r| (r, BTreeSet::new()))
            .collect();

        for (trip_id, stops) in &self.by_trip {
            let Some(route) = trips.route_of(trip_id) else {
                continue;
            };
            let set = per_route.entry(route).or_default();
            for stop in stops {
                set.insert(self.logical(stop));
            }
        }

        per_route
            .into_iter()
            .map(|(r, s)| (r.to_string(), s.len()))
            .collect()
    }
}

/// Per shape id, decided once at first encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeDecision {
    /// Not in the store: insert points.
    Insert,
    /// In the store, full mode: old points and line deleted, new points inserted.
    Replace,
    /// In the store, routes mode: left untouched.
    Skip,
}

#[derive(Debug, Clone, Default)]
pub struct ShapeStaging {
    set: StagingSet<String>,
    decisions: HashMap<String, ShapeDecision>,
}

impl ShapeStaging {
    pub fn decision(&self, shape_id: &str) -> Option<ShapeDecision> {
        self.decisions.get(shape_id).copied()
    }

    pub fn decide(&mut self, shape_id: &str, decision: ShapeDecision) {
        match decision {
            ShapeDecision::Insert => self.set.mark_new(shape_id.to_string()),
            ShapeDecision::Replace | ShapeDecision::Skip => {
                self.set.mark(shape_id.to_string());
            }
        }
        self.decisions.insert(shape_id.to_string(), decision);
    }

    pub fn seen(&self) -> &BTreeSet<String> {
        self.set.seen()
    }

    pub fn new_ids(&self) -> &BTreeSet<String> {
        self.set.new_ids()
    }
}

/// Feed-native agency key -> store id, for one run.
///
/// The first entry is the default for routes whose agency does not resolve,
/// unless [`AgencyMap::set_default`] picks another.
#[derive(Debug, Clone, Default)]
pub struct AgencyMap {
    ids: HashMap<String, i32>,
    default: Option<i32>,
}

impl AgencyMap {
    /// First insert of a key wins.
    pub fn insert(&mut self, key: &str, id: i32) {
        self.ids.entry(key.to_string()).or_insert(id);
        if self.default.is_none() {
            self.default = Some(id);
        }
    }

    /// Returns `false` when `key` is not mapped; the default stays unchanged.
    pub fn set_default(&mut self, key: &str) -> bool {
        match self.ids.get(key) {
            Some(id) => {
                self.default = Some(*id);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<i32> {
        self.ids.get(key).copied()
    }

    pub fn default_id(&self) -> Option<i32> {
        self.default
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
