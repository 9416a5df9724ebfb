use thiserror::Error;
use tt_feed::FeedFile;

/// Run-level failure. Any variant aborts the run and rolls the transaction back.
///
/// Row defects are not errors; they are counted in the summary.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no agency found in agency.txt")]
    NoAgencyFound,

    #[error("region {id} not found")]
    RegionNotFound { id: i32 },

    #[error("feed {id} not found")]
    FeedNotFound { id: i32 },

    #[error("feed {feed_id} belongs to region {actual_region_id}, not region {region_id}")]
    FeedRegionMismatch {
        feed_id: i32,
        region_id: i32,
        actual_region_id: i32,
    },

    #[error("incomplete import target: {0}")]
    MissingFeedTarget(String),

    #[error("required feed file missing: {0}")]
    MissingFile(FeedFile),

    #[error("feed source error: {0:#}")]
    Source(anyhow::Error),

    #[error("store error: {0:#}")]
    Store(anyhow::Error),
}

/// Tags an `anyhow` failure with the side of the boundary it came from.
pub trait ImportResultExt<T> {
    fn or_store(self) -> Result<T, ImportError>;
    fn or_source(self) -> Result<T, ImportError>;
}

impl<T> ImportResultExt<T> for anyhow::Result<T> {
    fn or_store(self) -> Result<T, ImportError> {
        self.map_err(ImportError::Store)
    }

    fn or_source(self) -> Result<T, ImportError> {
        self.map_err(ImportError::Source)
    }
}
