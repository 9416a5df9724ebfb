use tracing::{error, info, warn};
use tt_feed::RowSource;

use crate::engine::reconcile;
use crate::error::{ImportError, ImportResultExt};
use crate::progress::ProgressObserver;
use crate::store::StoreTransaction;
use crate::summary::ImportSummary;
use crate::types::{ImportOptions, TxOutcome};

/// Run one import inside `tx` and finish the transaction.
///
/// On success the transaction is committed or discarded according to
/// `outcome`; this is the only place a dry run differs from a real one.
/// On failure the transaction is rolled back and no summary is returned.
pub async fn run_import<T, S>(
    mut tx: T,
    source: &mut S,
    options: &ImportOptions,
    outcome: TxOutcome,
    progress: &dyn ProgressObserver,
) -> Result<ImportSummary, ImportError>
where
    T: StoreTransaction,
    S: RowSource + ?Sized,
{
    let mut summary = match reconcile(&mut tx, source, options, progress).await {
        Ok(summary) => summary,
        Err(err) => {
            error!(error = %err, "import failed; rolling back");
            if let Err(rb) = tx.rollback().await {
                warn!(error = %format!("{rb:#}"), "rollback after failed import also failed");
            }
            return Err(err);
        }
    };

    match outcome {
        TxOutcome::Commit => {
            tx.commit().await.or_store()?;
        }
        TxOutcome::Discard => {
            summary.dry_run = true;
            tx.rollback().await.or_store()?;
            info!(run_id = %summary.run_id, "dry run: writes discarded");
        }
    }

    summary.log();
    Ok(summary)
}
