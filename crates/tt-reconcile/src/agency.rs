use tracing::{info, warn};
use tt_feed::{AgencyRecord, FeedFile, RowSource};

use crate::engine::{open_file, RunContext};
use crate::error::{ImportError, ImportResultExt};
use crate::store::{FeedStore, NewAgency};

/// Look up or insert every agency and build the run's agency map.
///
/// An empty map after the whole file is a fatal precondition failure.
pub(crate) async fn stage_agencies<F, S>(
    store: &mut F,
    source: &mut S,
    ctx: &mut RunContext<'_>,
) -> Result<(), ImportError>
where
    F: FeedStore + ?Sized,
    S: RowSource + ?Sized,
{
    const FILE: FeedFile = FeedFile::Agency;

    if let Some(rows) = open_file(source, FILE)? {
        for row in rows {
            let row = row.or_source()?;
            ctx.row_read(FILE);

            let Some(rec) = AgencyRecord::from_row(&row) else {
                ctx.row_skipped(FILE, "missing agency_name");
                continue;
            };

            let up = store
                .ensure_agency(&NewAgency {
                    name: rec.name.clone(),
                    country_code: ctx.country_code.clone(),
                    url: rec.url.clone(),
                    timezone: rec.timezone.clone(),
                })
                .await
                .or_store()?;
            if up.inserted {
                ctx.summary.agencies_inserted += 1;
            }
            ctx.agencies.insert(rec.map_key(), up.id);
        }
    }

    if ctx.agencies.is_empty() {
        return Err(ImportError::NoAgencyFound);
    }

    if let Some(key) = ctx.options.default_agency.as_deref() {
        if !ctx.agencies.set_default(key) {
            warn!(
                default_agency = key,
                "configured default agency not in feed; using first agency"
            );
        }
    }

    info!(
        agencies = ctx.agencies.len(),
        agencies_inserted = ctx.summary.agencies_inserted,
        "agencies staged"
    );
    Ok(())
}
