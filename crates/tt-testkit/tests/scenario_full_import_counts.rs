// Full import of the acme fixture into an empty store.
//
// Pure in-process: MemoryStore + MemoryFeed.

use tt_reconcile::{Bounds, TxOutcome};
use tt_testkit::fixtures::{self, acme_feed, acme_options};
use tt_testkit::MemoryStore;

#[tokio::test]
async fn acme_full_import_reports_expected_counts() {
    let store = MemoryStore::new();
    let mut feed = acme_feed();

    let s = fixtures::import(&store, &mut feed, &acme_options(), TxOutcome::Commit)
        .await
        .expect("import");

    assert_eq!(s.regions_created, 1);
    assert_eq!(s.feeds_created, 1);
    assert_eq!(s.agencies_inserted, 1);
    assert_eq!(s.routes_inserted, 2);
    assert_eq!(s.routes_updated, 0);
    assert_eq!(s.shapes_inserted, 4);
    assert_eq!(s.shape_lines_inserted, 2);
    assert_eq!(s.route_shapes_inserted, 2);
    assert_eq!(s.trips_inserted, 2);
    assert_eq!(s.stop_times_inserted, 5);
    assert_eq!(s.stops_staged, 5);
    assert_eq!(s.route_stop_counts_updated, 2);
    assert_eq!(s.routes_archived, 0);
    assert_eq!(s.routes_deleted, 0);
    assert!(!s.dry_run);
}

#[tokio::test]
async fn acme_full_import_persists_routes_shapes_and_feed_metadata() {
    let store = MemoryStore::new();
    let mut feed = acme_feed();
    let s = fixtures::import(&store, &mut feed, &acme_options(), TxOutcome::Commit)
        .await
        .expect("import");

    let st = store.snapshot();
    let feed_id = s.feed_id.expect("feed id");
    let region_id = s.region_id.expect("region id");

    let r1 = st.route(feed_id, "R1").expect("R1");
    let r2 = st.route(feed_id, "R2").expect("R2");
    assert!(r1.is_active && r2.is_active);
    assert_eq!(r1.route_type, 3);
    assert_eq!(r2.route_type, 0);
    assert_eq!(r1.color.as_deref(), Some("0055AA"));
    assert_eq!(r2.color, None);
    assert_eq!(r1.short_name.as_deref(), Some("1"));
    assert_eq!(r1.long_name.as_deref(), Some("Harbour Line"));
    assert_eq!(r2.stop_count, Some(2));

    assert_eq!(st.shapes_of(r1.id), vec!["S1"]);
    assert_eq!(st.shapes_of(r2.id), vec!["S2"]);
    assert_eq!(st.shape("S1"), vec![(1, 0.0, 0.0), (2, 0.0, 1.0)]);

    // one degree of longitude on the equator
    let len = r1.longest_trip_length_m.expect("R1 length");
    assert!((len - 111_195.0).abs() < 10.0, "got {len}");

    let agency = st.agencies.values().next().expect("agency");
    assert_eq!(agency.name, "Acme Transit");
    assert_eq!(agency.country_code, fixtures::COUNTRY_CODE);
    assert_eq!(agency.timezone.as_deref(), Some("Europe/Stockholm"));
    assert_eq!(r1.agency_id, agency.id);

    let f = &st.feeds[&feed_id];
    assert_eq!(f.version.as_deref(), Some("2026.10"));
    assert!(f.imported_at.is_some());
    assert!(f.is_active);

    assert_eq!(
        st.regions[&region_id].bounds,
        Some(Bounds {
            min_lat: 0.0,
            min_lon: 0.0,
            max_lat: 1.0,
            max_lon: 1.0
        })
    );
}

#[tokio::test]
async fn named_region_and_feed_are_reused_on_the_next_run() {
    let store = MemoryStore::new();

    let first = fixtures::import(&store, &mut acme_feed(), &acme_options(), TxOutcome::Commit)
        .await
        .expect("first import");
    let second = fixtures::import(&store, &mut acme_feed(), &acme_options(), TxOutcome::Commit)
        .await
        .expect("second import");

    assert_eq!(second.regions_created, 0);
    assert_eq!(second.feeds_created, 0);
    assert_eq!(second.agencies_inserted, 0);
    assert_eq!(second.routes_inserted, 0);
    assert_eq!(second.routes_updated, 2);
    assert_eq!(first.feed_id, second.feed_id);
    assert_eq!(store.snapshot().routes.len(), 2);
}
