use tracing::{debug, info, warn};
use tt_feed::{FeedFile, RouteRecord, RouteTypeValue, RowSource};

use crate::engine::{open_file, RunContext};
use crate::error::{ImportError, ImportResultExt};
use crate::store::{FeedStore, RouteUpsert};

/// Upsert every route of the snapshot by `(feed, route_id)` and fill the
/// route staging set.
///
/// The route stage runs in both update modes. The staging set must hold
/// every route in the file for the stale-route stage to be correct.
pub(crate) async fn stage_routes<F, S>(
    store: &mut F,
    source: &mut S,
    ctx: &mut RunContext<'_>,
) -> Result<(), ImportError>
where
    F: FeedStore + ?Sized,
    S: RowSource + ?Sized,
{
    const FILE: FeedFile = FeedFile::Routes;
    let mut defaulted_agency = 0u64;

    if let Some(rows) = open_file(source, FILE)? {
        for row in rows {
            let row = row.or_source()?;
            ctx.row_read(FILE);

            let Some(rec) = RouteRecord::from_row(&row) else {
                ctx.row_skipped(FILE, "missing route_id");
                continue;
            };
            if ctx.routes.contains(&rec.route_id) {
                ctx.row_skipped(FILE, "duplicate route_id");
                continue;
            }

            let agency_id = match rec.agency_id.as_deref().and_then(|k| ctx.agencies.get(k)) {
                Some(id) => id,
                None => {
                    defaulted_agency += 1;
                    debug!(route_id = %rec.route_id, agency_id = ?rec.agency_id, "route agency unresolved; using default");
                    ctx.agencies.default_id().ok_or(ImportError::NoAgencyFound)?
                }
            };

            match rec.route_type {
                RouteTypeValue::Parsed(_) => {}
                RouteTypeValue::Missing => ctx.summary.route_type_defaulted += 1,
                RouteTypeValue::Invalid => ctx.summary.route_type_invalid += 1,
            }

            let up = store
                .upsert_route(&RouteUpsert {
                    feed_id: ctx.feed_id,
                    gtfs_route_id: rec.route_id.clone(),
                    agency_id,
                    short_name: rec.short_name,
                    long_name: rec.long_name,
                    route_type: rec.route_type,
                    color: rec.color,
                    text_color: rec.text_color,
                })
                .await
                .or_store()?;

            if up.inserted {
                ctx.summary.routes_inserted += 1;
            } else {
                ctx.summary.routes_updated += 1;
            }
            ctx.routes.record(&rec.route_id, up.id, up.inserted);
        }
    }

    if defaulted_agency > 0 {
        warn!(
            routes = defaulted_agency,
            "routes fell back to the default agency"
        );
    }

    info!(
        routes_seen = ctx.routes.seen_len(),
        routes_inserted = ctx.summary.routes_inserted,
        routes_updated = ctx.summary.routes_updated,
        route_type_defaulted = ctx.summary.route_type_defaulted,
        route_type_invalid = ctx.summary.route_type_invalid,
        "routes staged"
    );
    Ok(())
}
