use tracing::{info, warn};

use crate::engine::RunContext;
use crate::error::{ImportError, ImportResultExt};
use crate::store::FeedStore;
use crate::types::ReplaceMode;

/// Apply the replace mode to routes of the feed missing from this run.
pub(crate) async fn resolve<F>(store: &mut F, ctx: &mut RunContext<'_>) -> Result<(), ImportError>
where
    F: FeedStore + ?Sized,
{
    let seen = ctx.routes.seen_db_ids();

    match &ctx.options.replace_mode {
        ReplaceMode::Keep => {
            info!("replace mode keep: stale routes left as-is");
        }
        ReplaceMode::Archive => {
            if !seen.is_empty() {
                store.set_routes_active(&seen).await.or_store()?;
            }
            ctx.summary.routes_archived += store
                .deactivate_routes_except(ctx.feed_id, &seen)
                .await
                .or_store()?;
            info!(routes_archived = ctx.summary.routes_archived, "stale routes archived");
        }
        ReplaceMode::Delete => {
            ctx.summary.routes_deleted += store
                .delete_routes_except(ctx.feed_id, &seen)
                .await
                .or_store()?;
            info!(routes_deleted = ctx.summary.routes_deleted, "stale routes deleted");
        }
        ReplaceMode::Unrecognized(raw) => {
            warn!(replace_mode = %raw, "unrecognized replace mode; stale routes left as-is");
        }
    }
    Ok(())
}
