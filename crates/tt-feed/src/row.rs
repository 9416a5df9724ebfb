use std::collections::HashMap;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Entity files understood by the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFile {
    Agency,
    Routes,
    Trips,
    StopTimes,
    Stops,
    Shapes,
    FeedInfo,
}

impl FeedFile {
    pub const ALL: [FeedFile; 7] = [
        FeedFile::Agency,
        FeedFile::Routes,
        FeedFile::Trips,
        FeedFile::StopTimes,
        FeedFile::Stops,
        FeedFile::Shapes,
        FeedFile::FeedInfo,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            FeedFile::Agency => "agency.txt",
            FeedFile::Routes => "routes.txt",
            FeedFile::Trips => "trips.txt",
            FeedFile::StopTimes => "stop_times.txt",
            FeedFile::Stops => "stops.txt",
            FeedFile::Shapes => "shapes.txt",
            FeedFile::FeedInfo => "feed_info.txt",
        }
    }

    /// Files a feed may legitimately omit. A missing optional file reads as empty.
    pub fn is_optional(&self) -> bool {
        matches!(self, FeedFile::Shapes | FeedFile::FeedInfo)
    }
}

impl fmt::Display for FeedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// One row of a feed file: column name -> raw string value.
///
/// Absent columns and blank cells both read as `None`; callers never see an
/// error for a missing optional column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: HashMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for in-memory feeds.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Trimmed cell value; `None` when the column is absent or blank.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Owned variant of [`Row::get`].
    pub fn get_string(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Lazy, single-pass row sequence for one file.
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<Row>> + Send + 'a>;

/// Supplies the rows of a feed snapshot, one file at a time.
///
/// Each file is expected to be opened at most once per run; implementations
/// may exhaust underlying readers.
pub trait RowSource: Send {
    /// Open `file`. Returns `Ok(None)` when the file does not exist in this
    /// snapshot; IO and decoding failures are `Err`.
    fn open(&mut self, file: FeedFile) -> Result<Option<RowIter<'_>>>;
}
