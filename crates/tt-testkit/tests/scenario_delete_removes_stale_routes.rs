use tt_reconcile::{ReplaceMode, TxOutcome};
use tt_testkit::fixtures::{self, acme_feed, acme_options, acme_without_r2};
use tt_testkit::MemoryStore;

#[tokio::test]
async fn delete_leaves_no_row_and_no_orphaned_association() {
    let store = MemoryStore::new();
    let mut options = acme_options();

    let first = fixtures::import(&store, &mut acme_feed(), &options, TxOutcome::Commit)
        .await
        .expect("run 1");
    let feed_id = first.feed_id.expect("feed id");
    let r2_id = store.snapshot().route(feed_id, "R2").expect("R2").id;

    options.replace_mode = ReplaceMode::Delete;
    let second = fixtures::import(&store, &mut acme_without_r2(), &options, TxOutcome::Commit)
        .await
        .expect("run 2");

    assert_eq!(second.routes_deleted, 1);
    assert_eq!(second.routes_archived, 0);

    let st = store.snapshot();
    assert!(st.route(feed_id, "R2").is_none());
    assert!(st.route_shapes.iter().all(|(r, _)| *r != r2_id));
    let r1 = st.route(feed_id, "R1").expect("R1");
    assert_eq!(st.shapes_of(r1.id), vec!["S1"]);
}

#[tokio::test]
async fn unrecognized_replace_mode_is_a_no_op() {
    let store = MemoryStore::new();
    let mut options = acme_options();

    let first = fixtures::import(&store, &mut acme_feed(), &options, TxOutcome::Commit)
        .await
        .expect("run 1");
    let feed_id = first.feed_id.expect("feed id");

    options.replace_mode = ReplaceMode::parse("purge");
    let second = fixtures::import(&store, &mut acme_without_r2(), &options, TxOutcome::Commit)
        .await
        .expect("run 2");

    assert_eq!(second.routes_archived, 0);
    assert_eq!(second.routes_deleted, 0);
    let st = store.snapshot();
    assert!(st.route(feed_id, "R2").expect("R2").is_active);
}
