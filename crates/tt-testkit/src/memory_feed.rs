use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tt_feed::{FeedFile, Row, RowIter, RowSource};

/// Feed snapshot held as CSV text per file.
///
/// Cells are split on `,` with no quoting, which is enough for fixtures.
/// Records which files the engine opened, in order.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeed {
    tables: BTreeMap<FeedFile, String>,
    opened: Vec<FeedFile>,
    fail_on: Option<FeedFile>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, file: FeedFile, csv: &str) -> Self {
        self.tables.insert(file, csv.to_string());
        self
    }

    pub fn without(mut self, file: FeedFile) -> Self {
        self.tables.remove(&file);
        self
    }

    /// Make `open(file)` fail, as an unreadable file would.
    pub fn failing_on(mut self, file: FeedFile) -> Self {
        self.fail_on = Some(file);
        self
    }

    pub fn table(&self, file: FeedFile) -> Option<&str> {
        self.tables.get(&file).map(String::as_str)
    }

    pub fn opened(&self) -> &[FeedFile] {
        &self.opened
    }

    /// Write every table as `<dir>/<file_name>`.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        for (file, text) in &self.tables {
            let path = dir.join(file.file_name());
            std::fs::write(&path, text)
                .with_context(|| format!("write fixture failed: {}", path.display()))?;
        }
        Ok(())
    }
}

fn parse_table(text: &str) -> Vec<Row> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    lines
        .map(|line| {
            columns
                .iter()
                .zip(line.split(','))
                .map(|(c, v)| (*c, v))
                .collect::<Row>()
        })
        .collect()
}

impl RowSource for MemoryFeed {
    fn open(&mut self, file: FeedFile) -> Result<Option<RowIter<'_>>> {
        self.opened.push(file);
        if self.fail_on == Some(file) {
            anyhow::bail!("{file}: injected read failure");
        }
        Ok(self
            .tables
            .get(&file)
            .map(|text| {
                Box::new(parse_table(text).into_iter().map(Ok::<Row, anyhow::Error>)) as RowIter<'_>
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_blank_cells() {
        let mut feed = MemoryFeed::new().with_table(
            FeedFile::Stops,
            "stop_id,stop_name,parent_station\nA,Alpha,\nB,Bravo,P\n",
        );
        let rows: Vec<Row> = feed
            .open(FeedFile::Stops)
            .unwrap()
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("parent_station"), None);
        assert_eq!(rows[1].get("parent_station"), Some("P"));
        assert_eq!(feed.opened(), &[FeedFile::Stops]);
    }

    #[test]
    fn absent_table_opens_as_none() {
        let mut feed = MemoryFeed::new();
        assert!(feed.open(FeedFile::Shapes).unwrap().is_none());
    }
}
