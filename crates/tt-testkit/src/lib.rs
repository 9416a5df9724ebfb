//! tt-testkit
//!
//! In-process doubles for driving the reconciliation engine without
//! PostgreSQL: a transactional in-memory [`MemoryStore`], an in-memory
//! [`MemoryFeed`] row source, and the fixture feeds used by the scenario tests.

pub mod fixtures;
mod geometry;
mod memory_feed;
mod memory_store;
mod progress;

pub use geometry::haversine_m;
pub use memory_feed::MemoryFeed;
pub use memory_store::{
    MemoryState, MemoryStore, MemoryTx, StoredAgency, StoredFeed, StoredRegion, StoredRoute,
    StoredShapeLine, StoredShapePoint,
};
pub use progress::RecordingProgress;
