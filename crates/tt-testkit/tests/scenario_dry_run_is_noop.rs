use tt_reconcile::TxOutcome;
use tt_testkit::fixtures::{self, acme_feed, acme_options, acme_without_r2};
use tt_testkit::{MemoryState, MemoryStore};

#[tokio::test]
async fn dry_run_on_empty_store_counts_everything_and_writes_nothing() {
    let store = MemoryStore::new();

    let s = fixtures::import(&store, &mut acme_feed(), &acme_options(), TxOutcome::Discard)
        .await
        .expect("dry run");

    assert!(s.dry_run);
    assert_eq!(s.routes_inserted, 2);
    assert_eq!(s.shapes_inserted, 4);
    assert_eq!(s.route_shapes_inserted, 2);
    assert_eq!(store.snapshot(), MemoryState::default());
}

#[tokio::test]
async fn dry_run_against_populated_store_leaves_it_identical() {
    let store = MemoryStore::new();
    let options = acme_options();

    fixtures::import(&store, &mut acme_feed(), &options, TxOutcome::Commit)
        .await
        .expect("seed run");
    let before = store.snapshot();

    let dry = fixtures::import(&store, &mut acme_without_r2(), &options, TxOutcome::Discard)
        .await
        .expect("dry run");
    assert!(dry.dry_run);
    assert_eq!(dry.routes_archived, 1);
    assert_eq!(store.snapshot(), before);

    // the same run for real reports the same counts
    let real = fixtures::import(&store, &mut acme_without_r2(), &options, TxOutcome::Commit)
        .await
        .expect("real run");
    assert!(!real.dry_run);
    assert_eq!(real.counters(), dry.counters());
    assert_ne!(store.snapshot(), before);
}
