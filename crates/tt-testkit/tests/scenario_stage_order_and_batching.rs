use tt_feed::FeedFile;
use tt_reconcile::{run_import, Stage, TxOutcome};
use tt_testkit::fixtures::{self, acme_feed, acme_options};
use tt_testkit::{MemoryStore, RecordingProgress};

#[tokio::test]
async fn stages_and_files_run_in_fixed_order() {
    let store = MemoryStore::new();
    let mut feed = acme_feed();
    let mut options = acme_options();
    options.progress_every = 2;
    let progress = RecordingProgress::new();

    run_import(store.begin(), &mut feed, &options, TxOutcome::Commit, &progress)
        .await
        .expect("import");

    assert_eq!(progress.stages(), Stage::ORDER.to_vec());
    assert_eq!(
        feed.opened(),
        &[
            FeedFile::Agency,
            FeedFile::Routes,
            FeedFile::Trips,
            FeedFile::StopTimes,
            FeedFile::Stops,
            FeedFile::Shapes,
            FeedFile::FeedInfo,
        ]
    );
    assert_eq!(
        progress.row_ticks(),
        vec![
            (FeedFile::Routes, 2),
            (FeedFile::Trips, 2),
            (FeedFile::StopTimes, 2),
            (FeedFile::StopTimes, 4),
            (FeedFile::Stops, 2),
            (FeedFile::Stops, 4),
            (FeedFile::Shapes, 2),
            (FeedFile::Shapes, 4),
        ]
    );
}

#[tokio::test]
async fn zero_progress_every_reports_stages_only() {
    let store = MemoryStore::new();
    let mut options = acme_options();
    options.progress_every = 0;
    let progress = RecordingProgress::new();

    run_import(store.begin(), &mut acme_feed(), &options, TxOutcome::Commit, &progress)
        .await
        .expect("import");

    assert_eq!(progress.stages(), Stage::ORDER.to_vec());
    assert!(progress.row_ticks().is_empty());
}

#[tokio::test]
async fn shape_split_across_batches_is_replaced_once() {
    let store = MemoryStore::new();
    let mut options = acme_options();
    options.batch_size = 1;

    let first = fixtures::import(&store, &mut acme_feed(), &options, TxOutcome::Commit)
        .await
        .expect("run 1");
    assert_eq!(first.shapes_inserted, 4);

    // every point of S1 lands in its own batch; the second batch must not
    // treat the first batch's point as a previously stored shape
    let second = fixtures::import(&store, &mut acme_feed(), &options, TxOutcome::Commit)
        .await
        .expect("run 2");
    assert_eq!(second.shapes_inserted, 4);

    let st = store.snapshot();
    assert_eq!(st.shape("S1"), vec![(1, 0.0, 0.0), (2, 0.0, 1.0)]);
    assert_eq!(st.shape_points.len(), 4);
    assert_eq!(st.shape_lines.len(), 2);
}
