use tt_feed::FeedFile;
use tt_reconcile::{RowCounts, TxOutcome};
use tt_testkit::fixtures::{self, acme_feed, acme_options};
use tt_testkit::MemoryStore;

const ROUTES: &str = "\
route_id,agency_id,route_short_name,route_type
R1,ACME,1,3
,ACME,ghost,3
R2,ACME,2,tram
R3,ACME,3,
R1,ACME,1 again,3
";

const TRIPS: &str = "\
route_id,service_id,trip_id,shape_id
R1,WK,T1,S1
R2,WK,T2,
R1,WK,T1,S9
R3,WK,T3,S1
";

const SHAPES: &str = "\
shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence
S1,0,0,1
S1,north,1,2
S1,0,1,3
S1,0,2,
";

const STOP_TIMES: &str = "\
trip_id,arrival_time,departure_time,stop_id,stop_sequence
T1,08:00:00,08:00:00,A,1
,08:05:00,08:05:00,B,2
T3,08:00:00,08:00:00,A,1
";

#[tokio::test]
async fn defective_rows_are_dropped_and_counted() {
    let store = MemoryStore::new();
    let mut feed = acme_feed()
        .with_table(FeedFile::Routes, ROUTES)
        .with_table(FeedFile::Trips, TRIPS)
        .with_table(FeedFile::Shapes, SHAPES)
        .with_table(FeedFile::StopTimes, STOP_TIMES);

    let s = fixtures::import(&store, &mut feed, &acme_options(), TxOutcome::Commit)
        .await
        .expect("import");

    assert_eq!(s.routes_inserted, 3);
    assert_eq!(s.routes_updated, 0);
    assert_eq!(s.rows_for(FeedFile::Routes), RowCounts { read: 5, skipped: 2 });
    assert_eq!(s.route_type_invalid, 1);
    assert_eq!(s.route_type_defaulted, 1);

    assert_eq!(s.trips_inserted, 2);
    assert_eq!(s.rows_for(FeedFile::Trips), RowCounts { read: 4, skipped: 2 });

    assert_eq!(s.shapes_inserted, 2);
    assert_eq!(s.rows_for(FeedFile::Shapes), RowCounts { read: 4, skipped: 2 });

    assert_eq!(s.stop_times_inserted, 2);
    assert_eq!(s.rows_for(FeedFile::StopTimes).skipped, 1);

    let st = store.snapshot();
    let feed_id = s.feed_id.expect("feed id");
    assert_eq!(st.route(feed_id, "R1").expect("R1").short_name.as_deref(), Some("1"));
    assert_eq!(st.route(feed_id, "R2").expect("R2").route_type, 3);
    assert_eq!(st.route(feed_id, "R3").expect("R3").route_type, 3);
    assert_eq!(st.shape("S1"), vec![(1, 0.0, 0.0), (3, 0.0, 1.0)]);
    assert!(st.shape_lines.contains_key("S1"));
}

#[tokio::test]
async fn invalid_route_type_on_update_keeps_stored_value() {
    let store = MemoryStore::new();
    let first = fixtures::import(&store, &mut acme_feed(), &acme_options(), TxOutcome::Commit)
        .await
        .expect("run 1");
    let feed_id = first.feed_id.expect("feed id");
    assert_eq!(store.snapshot().route(feed_id, "R2").expect("R2").route_type, 0);

    let routes = "route_id,agency_id,route_type\nR1,ACME,3\nR2,ACME,tram\n";
    let second = fixtures::import(
        &store,
        &mut acme_feed().with_table(FeedFile::Routes, routes),
        &acme_options(),
        TxOutcome::Commit,
    )
    .await
    .expect("run 2");

    assert_eq!(second.route_type_invalid, 1);
    assert_eq!(store.snapshot().route(feed_id, "R2").expect("R2").route_type, 0);
}

#[tokio::test]
async fn unresolved_agency_falls_back_to_default() {
    let agencies = "agency_id,agency_name\nA1,Acme Transit\nB2,Bravo Bus\n";
    let routes = "route_id,agency_id,route_type\nR1,A1,3\nR2,ZZZ,3\nR3,,3\n";
    let feed = || {
        acme_feed()
            .with_table(FeedFile::Agency, agencies)
            .with_table(FeedFile::Routes, routes)
    };

    let store = MemoryStore::new();
    let s = fixtures::import(&store, &mut feed(), &acme_options(), TxOutcome::Commit)
        .await
        .expect("import");
    assert_eq!(s.agencies_inserted, 2);

    let st = store.snapshot();
    let feed_id = s.feed_id.expect("feed id");
    let id_of = |name: &str| {
        st.agencies
            .values()
            .find(|a| a.name == name)
            .map(|a| a.id)
            .expect("agency")
    };
    let acme = id_of("Acme Transit");
    let bravo = id_of("Bravo Bus");
    assert_eq!(st.route(feed_id, "R2").expect("R2").agency_id, acme);
    assert_eq!(st.route(feed_id, "R3").expect("R3").agency_id, acme);

    let mut options = acme_options();
    options.default_agency = Some("B2".to_string());
    fixtures::import(&store, &mut feed(), &options, TxOutcome::Commit)
        .await
        .expect("import with explicit default");

    let st = store.snapshot();
    assert_eq!(st.route(feed_id, "R1").expect("R1").agency_id, acme);
    assert_eq!(st.route(feed_id, "R2").expect("R2").agency_id, bravo);
    assert_eq!(st.route(feed_id, "R3").expect("R3").agency_id, bravo);
}
