use tracing::info;

use crate::engine::RunContext;
use crate::error::{ImportError, ImportResultExt};
use crate::store::{FeedStore, NewFeed, NewRegion};
use crate::types::{FeedTarget, RegionTarget};

/// Resolve (or create) the region and feed the run writes into.
pub(crate) async fn resolve<F>(store: &mut F, ctx: &mut RunContext<'_>) -> Result<(), ImportError>
where
    F: FeedStore + ?Sized,
{
    let options = ctx.options;

    let (region_id, country_code) = match &options.region {
        RegionTarget::Id(id) => {
            let region = store
                .find_region(*id)
                .await
                .or_store()?
                .ok_or(ImportError::RegionNotFound { id: *id })?;
            (region.id, region.country_code)
        }
        RegionTarget::Named { name, country_code } => {
            let up = store
                .ensure_region(&NewRegion {
                    name: name.clone(),
                    country_code: country_code.clone(),
                    scope: options.scope,
                })
                .await
                .or_store()?;
            if up.inserted {
                ctx.summary.regions_created += 1;
            }
            (up.id, country_code.clone())
        }
    };

    let feed_id = match &options.feed {
        FeedTarget::Id(id) => {
            let feed = store
                .find_feed(*id)
                .await
                .or_store()?
                .ok_or(ImportError::FeedNotFound { id: *id })?;
            if feed.region_id != region_id {
                return Err(ImportError::FeedRegionMismatch {
                    feed_id: feed.id,
                    region_id,
                    actual_region_id: feed.region_id,
                });
            }
            feed.id
        }
        FeedTarget::Named { name, source_url } => {
            let up = store
                .ensure_feed(&NewFeed {
                    region_id,
                    name: name.clone(),
                    source_url: source_url.clone(),
                    scope: options.scope,
                })
                .await
                .or_store()?;
            if up.inserted {
                ctx.summary.feeds_created += 1;
            }
            up.id
        }
    };

    ctx.region_id = region_id;
    ctx.feed_id = feed_id;
    ctx.country_code = country_code;
    ctx.summary.region_id = Some(region_id);
    ctx.summary.feed_id = Some(feed_id);

    info!(
        region_id,
        feed_id,
        country_code = %ctx.country_code,
        regions_created = ctx.summary.regions_created,
        feeds_created = ctx.summary.feeds_created,
        "import target resolved"
    );
    Ok(())
}
