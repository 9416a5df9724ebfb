//! Fixture feeds.
//!
//! The "acme" feed: agency Acme Transit, routes R1 and R2, trips T1 -> R1/S1
//! and T2 -> R2/S2, two-point shapes S1 and S2. Stops B and C are platforms
//! of station P, so R1 (A, B, C) counts two logical stops.

use tt_feed::FeedFile;
use tt_reconcile::{
    run_import, DataScope, FeedTarget, ImportError, ImportOptions, ImportSummary, NoopProgress,
    RegionTarget, TxOutcome,
};

use crate::{MemoryFeed, MemoryStore};

pub const REGION_NAME: &str = "Testland";
pub const COUNTRY_CODE: &str = "TL";
pub const FEED_NAME: &str = "acme";

pub const AGENCY: &str = "\
agency_id,agency_name,agency_url,agency_timezone
ACME,Acme Transit,https://acme.example,Europe/Stockholm
";

pub const ROUTES: &str = "\
route_id,agency_id,route_short_name,route_long_name,route_type,route_color
R1,ACME,1,Harbour Line,3,0055AA
R2,ACME,2,Hill Line,0,
";

pub const ROUTES_WITHOUT_R2: &str = "\
route_id,agency_id,route_short_name,route_long_name,route_type,route_color
R1,ACME,1,Harbour Line,3,0055AA
";

pub const TRIPS: &str = "\
route_id,service_id,trip_id,shape_id
R1,WK,T1,S1
R2,WK,T2,S2
";

pub const STOP_TIMES: &str = "\
trip_id,arrival_time,departure_time,stop_id,stop_sequence
T1,08:00:00,08:00:00,A,1
T1,08:05:00,08:05:00,B,2
T1,08:09:00,08:09:00,C,3
T2,09:00:00,09:00:00,A,1
T2,09:07:00,09:07:00,D,2
";

pub const STOPS: &str = "\
stop_id,stop_name,stop_lat,stop_lon,parent_station
A,Alpha,0.0,0.0,
B,Bravo platform 1,0.0,0.5,P
C,Bravo platform 2,0.0,0.5,P
D,Delta,1.0,1.0,
P,Bravo,0.0,0.5,
";

pub const SHAPES: &str = "\
shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence
S1,0,0,1
S1,0,1,2
S2,1,0,1
S2,1,1,2
";

pub const FEED_INFO: &str = "\
feed_publisher_name,feed_version
Acme Transit,2026.10
";

/// The concrete two-route scenario.
pub fn acme_feed() -> MemoryFeed {
    MemoryFeed::new()
        .with_table(FeedFile::Agency, AGENCY)
        .with_table(FeedFile::Routes, ROUTES)
        .with_table(FeedFile::Trips, TRIPS)
        .with_table(FeedFile::StopTimes, STOP_TIMES)
        .with_table(FeedFile::Stops, STOPS)
        .with_table(FeedFile::Shapes, SHAPES)
        .with_table(FeedFile::FeedInfo, FEED_INFO)
}

/// Same snapshot with R2 dropped from routes.txt only.
pub fn acme_without_r2() -> MemoryFeed {
    acme_feed().with_table(FeedFile::Routes, ROUTES_WITHOUT_R2)
}

/// Adds route R3 with trips T3 -> S3 (new shape) and T4 -> S1 (existing shape).
pub fn acme_with_r3() -> MemoryFeed {
    acme_feed()
        .with_table(
            FeedFile::Routes,
            &format!("{ROUTES}R3,ACME,3,Ring Line,3,\n"),
        )
        .with_table(FeedFile::Trips, &format!("{TRIPS}R3,WK,T3,S3\nR3,WK,T4,S1\n"))
        .with_table(
            FeedFile::StopTimes,
            &format!("{STOP_TIMES}T3,10:00:00,10:00:00,D,1\nT3,10:06:00,10:06:00,E,2\nT4,11:00:00,11:00:00,A,1\n"),
        )
        .with_table(FeedFile::Stops, &format!("{STOPS}E,Echo,2.0,2.0,\n"))
        .with_table(FeedFile::Shapes, &format!("{SHAPES}S3,2,0,1\nS3,2,1,2\nS3,2,2,3\n"))
}

/// Options targeting the fixture region and feed by name.
pub fn acme_options() -> ImportOptions {
    let mut options = ImportOptions::new(
        RegionTarget::Named {
            name: REGION_NAME.to_string(),
            country_code: COUNTRY_CODE.to_string(),
        },
        FeedTarget::Named {
            name: FEED_NAME.to_string(),
            source_url: Some("https://acme.example/gtfs.zip".to_string()),
        },
    );
    options.scope = DataScope::Regional;
    options
}

/// Run one import against a fresh transaction of `store`.
pub async fn import(
    store: &MemoryStore,
    feed: &mut MemoryFeed,
    options: &ImportOptions,
    outcome: TxOutcome,
) -> Result<ImportSummary, ImportError> {
    run_import(store.begin(), feed, options, outcome, &NoopProgress).await
}
