//! tt-feed
//!
//! Row Source boundary for transit feed snapshots.
//!
//! A feed directory holds one tabular file per entity kind (`agency.txt`,
//! `routes.txt`, ...). This crate turns each file into a lazy sequence of
//! [`Row`] values (column name -> string value) and provides the typed record
//! parsers that apply the row-level skip/default rules.
//!
//! It does **not** touch the store; the reconciliation engine (`tt-reconcile`)
//! consumes the rows and decides what gets written.

mod csv_dir;
mod records;
mod row;

pub use csv_dir::CsvFeedDir;
pub use records::{
    AgencyRecord, FeedInfoRecord, RouteRecord, RouteTypeValue, ShapePointRecord, StopRecord,
    StopTimeRecord, TripRecord, DEFAULT_ROUTE_TYPE,
};
pub use row::{FeedFile, Row, RowIter, RowSource};
