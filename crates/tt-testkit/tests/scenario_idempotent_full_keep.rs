// Same unchanged feed twice, full mode, replace mode keep.

use tt_reconcile::{ReplaceMode, TxOutcome};
use tt_testkit::fixtures::{self, acme_feed, acme_options};
use tt_testkit::{MemoryState, MemoryStore};

fn shape_view(st: &MemoryState) -> Vec<(String, Vec<(i32, f64, f64)>)> {
    st.shape_lines
        .keys()
        .map(|id| (id.clone(), st.shape(id)))
        .collect()
}

#[tokio::test]
async fn second_identical_run_changes_nothing() {
    let store = MemoryStore::new();
    let mut options = acme_options();
    options.replace_mode = ReplaceMode::Keep;

    fixtures::import(&store, &mut acme_feed(), &options, TxOutcome::Commit)
        .await
        .expect("run 1");
    let after_first = store.snapshot();

    let second = fixtures::import(&store, &mut acme_feed(), &options, TxOutcome::Commit)
        .await
        .expect("run 2");
    let after_second = store.snapshot();

    assert_eq!(second.routes_archived, 0);
    assert_eq!(second.routes_deleted, 0);
    assert_eq!(second.routes_inserted, 0);
    assert_eq!(second.route_stop_counts_updated, 0);

    assert_eq!(after_first.routes, after_second.routes);
    assert_eq!(after_first.route_shapes, after_second.route_shapes);
    assert_eq!(after_first.shape_lines, after_second.shape_lines);
    assert_eq!(shape_view(&after_first), shape_view(&after_second));
    assert_eq!(after_first.agencies, after_second.agencies);
}
