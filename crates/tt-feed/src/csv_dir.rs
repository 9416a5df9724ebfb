//! CSV-backed [`RowSource`] over a feed directory.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::row::{FeedFile, Row, RowIter, RowSource};

/// Reads `<dir>/<file_name>` for each requested [`FeedFile`].
///
/// Headers are matched case-sensitively after trimming whitespace and a
/// leading UTF-8 BOM. Short records are tolerated: trailing columns simply
/// read as absent.
#[derive(Debug, Clone)]
pub struct CsvFeedDir {
    dir: PathBuf,
}

impl CsvFeedDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, file: FeedFile) -> PathBuf {
        self.dir.join(file.file_name())
    }
}

impl RowSource for CsvFeedDir {
    fn open(&mut self, file: FeedFile) -> Result<Option<RowIter<'_>>> {
        let path = self.path_for(file);
        if !path.exists() {
            debug!(file = %file, path = %path.display(), "feed file not present");
            return Ok(None);
        }

        let handle = File::open(&path)
            .with_context(|| format!("open feed file failed: {}", path.display()))?;
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(handle);

        let headers: Vec<String> = rdr
            .headers()
            .with_context(|| format!("read header row failed: {}", path.display()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let display = path.display().to_string();
        let rows = rdr.into_records().enumerate().map(move |(idx, rec)| {
            let rec = rec.with_context(|| format!("{display}: bad record at row {}", idx + 1))?;
            Ok(headers
                .iter()
                .zip(rec.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect::<Row>())
        });

        Ok(Some(Box::new(rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(src: &mut CsvFeedDir, file: FeedFile) -> Vec<Row> {
        src.open(file)
            .unwrap()
            .expect("file present")
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut src = CsvFeedDir::new(dir.path());
        assert!(src.open(FeedFile::Shapes).unwrap().is_none());
    }

    #[test]
    fn reads_rows_by_header_and_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("routes.txt"),
            "\u{feff}route_id,agency_id,route_short_name,route_type\nR1,A,1,3\nR2,A,2\n",
        )
        .unwrap();

        let mut src = CsvFeedDir::new(dir.path());
        let rows = collect(&mut src, FeedFile::Routes);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("route_id"), Some("R1"));
        assert_eq!(rows[0].get("route_type"), Some("3"));
        // short record: trailing column absent, not an error
        assert_eq!(rows[1].get("route_short_name"), Some("2"));
        assert_eq!(rows[1].get("route_type"), None);
    }
}
