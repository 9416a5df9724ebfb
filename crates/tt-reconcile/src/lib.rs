//! tt-reconcile
//!
//! Feed reconciliation engine.
//!
//! Takes one feed snapshot (through a [`tt_feed::RowSource`]) and reconciles it
//! against the state already persisted for that feed (through a [`FeedStore`]).
//! Stage order is fixed:
//!
//! target -> agencies -> routes -> trips -> stop_times -> stops -> shapes
//! -> associations -> statistics -> stale routes -> feed bookkeeping
//!
//! Later stages read the staging sets built by earlier ones. The engine never
//! commits. [`run_import`] owns the transaction and decides commit vs discard
//! once, after every stage has succeeded.
//!
//! No SQL and no file IO live here.

mod agency;
mod association;
mod boundary;
mod engine;
mod error;
mod progress;
mod route;
mod shape;
mod stale;
mod staging;
mod stats;
mod store;
mod summary;
mod target;
mod trip;
mod types;

pub use boundary::run_import;
pub use engine::reconcile;
pub use error::{ImportError, ImportResultExt};
pub use progress::{NoopProgress, ProgressObserver, Stage};
pub use staging::{
    AgencyMap, RouteStaging, ShapeDecision, ShapeStaging, StagingSet, StopStaging, TripStaging,
};
pub use store::{
    FeedRow, FeedStore, NewAgency, NewFeed, NewRegion, RegionRow, RouteUpsert, ShapePoint,
    StoreTransaction, Upserted,
};
pub use summary::{ImportSummary, RowCounts};
pub use types::{
    Bounds, DataScope, FeedTarget, ImportOptions, RegionTarget, ReplaceMode, TxOutcome,
    UnknownVariant, UpdateMode, DEFAULT_BATCH_SIZE, DEFAULT_PROGRESS_EVERY,
};
