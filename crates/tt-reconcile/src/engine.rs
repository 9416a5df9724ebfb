use chrono::Utc;
use tracing::{debug, info};
use tt_feed::{FeedFile, FeedInfoRecord, RowIter, RowSource};
use uuid::Uuid;

use crate::error::{ImportError, ImportResultExt};
use crate::progress::{ProgressObserver, Stage};
use crate::staging::{AgencyMap, RouteStaging, ShapeStaging, StopStaging, TripStaging};
use crate::store::FeedStore;
use crate::summary::ImportSummary;
use crate::types::{Bounds, ImportOptions};
use crate::{agency, association, route, shape, stale, stats, target, trip};

/// Explicit state of one run, handed from stage to stage.
pub(crate) struct RunContext<'a> {
    pub options: &'a ImportOptions,
    progress: &'a dyn ProgressObserver,

    pub region_id: i32,
    pub feed_id: i32,
    pub country_code: String,

    pub agencies: AgencyMap,
    pub routes: RouteStaging,
    pub trips: TripStaging,
    pub stops: StopStaging,
    pub shapes: ShapeStaging,
    pub stop_bounds: Option<Bounds>,

    pub summary: ImportSummary,
}

impl<'a> RunContext<'a> {
    fn new(options: &'a ImportOptions, progress: &'a dyn ProgressObserver) -> Self {
        Self {
            options,
            progress,
            region_id: 0,
            feed_id: 0,
            country_code: String::new(),
            agencies: AgencyMap::default(),
            routes: RouteStaging::default(),
            trips: TripStaging::default(),
            stops: StopStaging::default(),
            shapes: ShapeStaging::default(),
            stop_bounds: None,
            summary: ImportSummary::new(Uuid::new_v4()),
        }
    }

    pub fn stage(&self, stage: Stage) {
        info!(stage = %stage, feed_id = self.feed_id, "stage start");
        self.progress.on_stage(stage);
    }

    pub fn row_read(&mut self, file: FeedFile) {
        let n = self.summary.row_read(file);
        let every = self.options.progress_every;
        if every > 0 && n % every == 0 {
            self.progress.on_progress(file, n);
        }
    }

    pub fn row_skipped(&mut self, file: FeedFile, reason: &'static str) {
        let n = self.summary.rows_for(file).read;
        debug!(file = %file, row = n, reason, "row skipped");
        self.summary.row_skipped(file);
    }

    pub fn is_full(&self) -> bool {
        self.options.update_mode.is_full()
    }
}

/// Open `file`, turning a missing required file into [`ImportError::MissingFile`].
pub(crate) fn open_file<S>(source: &mut S, file: FeedFile) -> Result<Option<RowIter<'_>>, ImportError>
where
    S: RowSource + ?Sized,
{
    match source.open(file).or_source()? {
        Some(rows) => Ok(Some(rows)),
        None if file.is_optional() => {
            debug!(file = %file, "optional feed file absent");
            Ok(None)
        }
        None => Err(ImportError::MissingFile(file)),
    }
}

/// Reconcile one feed snapshot against `store`.
///
/// Runs every stage in order on the caller's transaction and returns the
/// summary. Never commits or rolls back; the caller does that (see
/// [`crate::run_import`]). On error, whatever was written is the caller's to
/// discard.
pub async fn reconcile<F, S>(
    store: &mut F,
    source: &mut S,
    options: &ImportOptions,
    progress: &dyn ProgressObserver,
) -> Result<ImportSummary, ImportError>
where
    F: FeedStore + ?Sized,
    S: RowSource + ?Sized,
{
    let mut ctx = RunContext::new(options, progress);
    info!(
        run_id = %ctx.summary.run_id,
        update_mode = %options.update_mode,
        replace_mode = %options.replace_mode,
        batch_size = options.batch_size,
        "import start"
    );

    ctx.stage(Stage::Target);
    target::resolve(store, &mut ctx).await?;

    ctx.stage(Stage::Agencies);
    agency::stage_agencies(store, source, &mut ctx).await?;

    ctx.stage(Stage::Routes);
    route::stage_routes(store, source, &mut ctx).await?;

    ctx.stage(Stage::Trips);
    trip::stage_trips(source, &mut ctx)?;

    ctx.stage(Stage::StopTimes);
    trip::stage_stop_times(source, &mut ctx)?;

    ctx.stage(Stage::Stops);
    trip::stage_stops(source, &mut ctx)?;

    ctx.stage(Stage::Shapes);
    shape::stage_shapes(store, source, &mut ctx).await?;

    ctx.stage(Stage::Associations);
    association::refresh(store, &mut ctx).await?;

    ctx.stage(Stage::Statistics);
    stats::recompute(store, &mut ctx).await?;

    ctx.stage(Stage::StaleRoutes);
    stale::resolve(store, &mut ctx).await?;

    ctx.stage(Stage::FeedInfo);
    finish_feed(store, source, &mut ctx).await?;

    Ok(ctx.summary)
}

async fn finish_feed<F, S>(
    store: &mut F,
    source: &mut S,
    ctx: &mut RunContext<'_>,
) -> Result<(), ImportError>
where
    F: FeedStore + ?Sized,
    S: RowSource + ?Sized,
{
    let mut version = None;
    if let Some(rows) = open_file(source, FeedFile::FeedInfo)? {
        for row in rows {
            let row = row.or_source()?;
            ctx.row_read(FeedFile::FeedInfo);
            if version.is_none() {
                version = FeedInfoRecord::from_row(&row).version;
            }
        }
    }

    store
        .mark_feed_imported(ctx.feed_id, version.as_deref(), Utc::now())
        .await
        .or_store()?;

    if let Some(bounds) = ctx.stop_bounds {
        store
            .widen_region_bounds(ctx.region_id, &bounds)
            .await
            .or_store()?;
    }

    info!(feed_id = ctx.feed_id, version = ?version, "feed marked imported");
    Ok(())
}
