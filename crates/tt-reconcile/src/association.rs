use tracing::info;

use crate::engine::RunContext;
use crate::error::{ImportError, ImportResultExt};
use crate::store::FeedStore;

/// Rebuild shape lines and route <-> shape associations for the run's scope.
///
/// Full mode clears the associations of every route seen this run, then
/// builds lines for every seen shape and links every staged trip pair.
/// Routes mode clears nothing and only touches new shapes and new routes.
pub(crate) async fn refresh<F>(store: &mut F, ctx: &mut RunContext<'_>) -> Result<(), ImportError>
where
    F: FeedStore + ?Sized,
{
    let full = ctx.is_full();

    let mut cleared = 0;
    if full {
        let seen = ctx.routes.seen_db_ids();
        if !seen.is_empty() {
            cleared = store.clear_route_shapes(&seen).await.or_store()?;
        }
    }

    let line_ids: Vec<String> = if full {
        ctx.shapes.seen().iter().cloned().collect()
    } else {
        ctx.shapes.new_ids().iter().cloned().collect()
    };
    if !line_ids.is_empty() {
        ctx.summary.shape_lines_inserted += store.insert_shape_lines(&line_ids).await.or_store()?;
    }

    let pairs: Vec<(i32, String)> = ctx
        .trips
        .route_shape_pairs()
        .into_iter()
        .filter(|(route, _)| full || ctx.routes.is_new(route))
        .filter_map(|(route, shape)| Some((ctx.routes.db_id(route)?, shape.to_string())))
        .collect();
    if !pairs.is_empty() {
        ctx.summary.route_shapes_inserted += store
            .insert_route_shapes(ctx.feed_id, &pairs)
            .await
            .or_store()?;
    }

    info!(
        associations_cleared = cleared,
        shape_lines_inserted = ctx.summary.shape_lines_inserted,
        route_shapes_inserted = ctx.summary.route_shapes_inserted,
        "associations refreshed"
    );
    Ok(())
}
