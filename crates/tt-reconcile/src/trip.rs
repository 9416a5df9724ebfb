//! Staging-only entities: trips, stop-times and stops. Nothing is written to
//! the store here; later stages join on what these build.

use tracing::info;
use tt_feed::{FeedFile, RowSource, StopRecord, StopTimeRecord, TripRecord};

use crate::engine::{open_file, RunContext};
use crate::error::{ImportError, ImportResultExt};
use crate::types::Bounds;

pub(crate) fn stage_trips<S>(source: &mut S, ctx: &mut RunContext<'_>) -> Result<(), ImportError>
where
    S: RowSource + ?Sized,
{
    const FILE: FeedFile = FeedFile::Trips;
    let full = ctx.is_full();

    if let Some(rows) = open_file(source, FILE)? {
        for row in rows {
            let row = row.or_source()?;
            ctx.row_read(FILE);

            let Some(rec) = TripRecord::from_row(&row) else {
                ctx.row_skipped(FILE, "missing trip_id, route_id or shape_id");
                continue;
            };
            // routes mode: only trips of routes inserted this run
            if !full && !ctx.routes.is_new(&rec.route_id) {
                continue;
            }
            if !ctx.trips.insert(rec.trip_id, rec.route_id, rec.shape_id) {
                ctx.row_skipped(FILE, "duplicate trip_id");
                continue;
            }
            ctx.summary.trips_inserted += 1;
        }
    }

    info!(trips_inserted = ctx.summary.trips_inserted, "trips staged");
    Ok(())
}

pub(crate) fn stage_stop_times<S>(source: &mut S, ctx: &mut RunContext<'_>) -> Result<(), ImportError>
where
    S: RowSource + ?Sized,
{
    const FILE: FeedFile = FeedFile::StopTimes;
    let full = ctx.is_full();

    if let Some(rows) = open_file(source, FILE)? {
        for row in rows {
            let row = row.or_source()?;
            ctx.row_read(FILE);

            let Some(rec) = StopTimeRecord::from_row(&row) else {
                ctx.row_skipped(FILE, "missing trip_id or stop_id");
                continue;
            };
            if !full && !ctx.trips.contains(&rec.trip_id) {
                continue;
            }
            ctx.stops.add_stop_time(rec.trip_id, rec.stop_id);
            ctx.summary.stop_times_inserted += 1;
        }
    }

    info!(
        stop_times_inserted = ctx.summary.stop_times_inserted,
        "stop times staged"
    );
    Ok(())
}

pub(crate) fn stage_stops<S>(source: &mut S, ctx: &mut RunContext<'_>) -> Result<(), ImportError>
where
    S: RowSource + ?Sized,
{
    const FILE: FeedFile = FeedFile::Stops;

    if let Some(rows) = open_file(source, FILE)? {
        for row in rows {
            let row = row.or_source()?;
            ctx.row_read(FILE);

            let Some(rec) = StopRecord::from_row(&row) else {
                ctx.row_skipped(FILE, "missing stop_id");
                continue;
            };
            if let Some((lat, lon)) = rec.position() {
                ctx.stop_bounds = Some(match ctx.stop_bounds {
                    Some(mut b) => {
                        b.include(lat, lon);
                        b
                    }
                    None => Bounds::point(lat, lon),
                });
            }
            ctx.stops.add_stop(&rec);
            ctx.summary.stops_staged += 1;
        }
    }

    info!(stops_staged = ctx.summary.stops_staged, "stops staged");
    Ok(())
}
