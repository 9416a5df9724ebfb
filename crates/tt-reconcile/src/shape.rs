use std::collections::BTreeSet;

use tracing::info;
use tt_feed::{FeedFile, RowSource, ShapePointRecord};

use crate::engine::{open_file, RunContext};
use crate::error::{ImportError, ImportResultExt};
use crate::staging::ShapeDecision;
use crate::store::{FeedStore, ShapePoint};

/// Stream shape points into the store in fixed-size batches.
///
/// Each shape id is classified once, the first time a batch containing it is
/// flushed:
/// - absent from the store: [`ShapeDecision::Insert`]
/// - present, full mode: [`ShapeDecision::Replace`] (old points and line deleted)
/// - present, routes mode: [`ShapeDecision::Skip`]
///
/// In routes mode only shapes reachable from staged trips are read.
pub(crate) async fn stage_shapes<F, S>(
    store: &mut F,
    source: &mut S,
    ctx: &mut RunContext<'_>,
) -> Result<(), ImportError>
where
    F: FeedStore + ?Sized,
    S: RowSource + ?Sized,
{
    const FILE: FeedFile = FeedFile::Shapes;

    let filter: Option<BTreeSet<String>> = if ctx.is_full() {
        None
    } else {
        Some(ctx.trips.shape_ids())
    };
    let batch_size = ctx.options.batch_size.max(1);
    let mut batch: Vec<ShapePoint> = Vec::with_capacity(batch_size);
    let mut replaced = 0u64;

    if let Some(rows) = open_file(source, FILE)? {
        for row in rows {
            let row = row.or_source()?;
            ctx.row_read(FILE);

            let Some(rec) = ShapePointRecord::from_row(&row) else {
                ctx.row_skipped(FILE, "missing shape_id, coordinates or sequence");
                continue;
            };
            if let Some(f) = &filter {
                if !f.contains(&rec.shape_id) {
                    continue;
                }
            }

            batch.push(ShapePoint {
                gtfs_shape_id: rec.shape_id,
                sequence: rec.sequence,
                lat: rec.lat,
                lon: rec.lon,
            });
            if batch.len() >= batch_size {
                replaced += flush(store, ctx, &mut batch).await?;
            }
        }
    }
    replaced += flush(store, ctx, &mut batch).await?;

    info!(
        shapes_seen = ctx.shapes.seen().len(),
        shapes_new = ctx.shapes.new_ids().len(),
        shapes_replaced = replaced,
        shapes_inserted = ctx.summary.shapes_inserted,
        "shapes staged"
    );
    Ok(())
}

/// Classify undecided ids in `batch`, then bulk insert the points that are
/// not skipped. Returns the number of shape ids replaced by this flush.
async fn flush<F>(
    store: &mut F,
    ctx: &mut RunContext<'_>,
    batch: &mut Vec<ShapePoint>,
) -> Result<u64, ImportError>
where
    F: FeedStore + ?Sized,
{
    if batch.is_empty() {
        return Ok(0);
    }

    let undecided: Vec<String> = batch
        .iter()
        .map(|p| p.gtfs_shape_id.as_str())
        .filter(|id| ctx.shapes.decision(id).is_none())
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut to_replace = Vec::new();
    if !undecided.is_empty() {
        let existing = store.existing_shape_ids(&undecided).await.or_store()?;
        let full = ctx.is_full();
        for id in &undecided {
            let decision = match (existing.contains(id), full) {
                (false, _) => ShapeDecision::Insert,
                (true, true) => ShapeDecision::Replace,
                (true, false) => ShapeDecision::Skip,
            };
            if decision == ShapeDecision::Replace {
                to_replace.push(id.clone());
            }
            ctx.shapes.decide(id, decision);
        }
    }
    if !to_replace.is_empty() {
        store.delete_shapes(&to_replace).await.or_store()?;
    }

    let points: Vec<ShapePoint> = batch
        .drain(..)
        .filter(|p| ctx.shapes.decision(&p.gtfs_shape_id) != Some(ShapeDecision::Skip))
        .collect();
    if !points.is_empty() {
        let n = store.insert_shape_points(&points).await.or_store()?;
        ctx.summary.shapes_inserted += n;
    }

    Ok(to_replace.len() as u64)
}
