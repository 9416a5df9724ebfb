use tracing::info;

use crate::engine::RunContext;
use crate::error::{ImportError, ImportResultExt};
use crate::store::FeedStore;

/// Recompute per-route stop counts and longest-trip lengths.
///
/// Stop counts cover routes with staged trips; other routes keep their stored
/// value. The "no shapes -> clear length" pass always runs over the whole feed.
pub(crate) async fn recompute<F>(store: &mut F, ctx: &mut RunContext<'_>) -> Result<(), ImportError>
where
    F: FeedStore + ?Sized,
{
    let counts: Vec<(i32, i32)> = ctx
        .stops
        .stop_counts(&ctx.trips)
        .into_iter()
        .filter_map(|(route, n)| {
            let id = ctx.routes.db_id(&route)?;
            Some((id, i32::try_from(n).unwrap_or(i32::MAX)))
        })
        .collect();
    if !counts.is_empty() {
        ctx.summary.route_stop_counts_updated +=
            store.update_stop_counts(&counts).await.or_store()?;
    }

    let lengths_set = if ctx.is_full() {
        store
            .update_longest_trip_lengths(ctx.feed_id, None)
            .await
            .or_store()?
    } else {
        let new_ids = ctx.routes.new_db_ids();
        if new_ids.is_empty() {
            0
        } else {
            store
                .update_longest_trip_lengths(ctx.feed_id, Some(&new_ids))
                .await
                .or_store()?
        }
    };
    let lengths_cleared = store
        .clear_longest_trip_lengths_without_shapes(ctx.feed_id)
        .await
        .or_store()?;

    info!(
        routes_counted = counts.len(),
        route_stop_counts_updated = ctx.summary.route_stop_counts_updated,
        longest_trip_lengths_set = lengths_set,
        longest_trip_lengths_cleared = lengths_cleared,
        "route statistics recomputed"
    );
    Ok(())
}
