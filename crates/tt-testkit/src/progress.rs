use std::sync::Mutex;

use tt_feed::FeedFile;
use tt_reconcile::{ProgressObserver, Stage};

/// Observer that remembers every callback, for asserting stage order.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    stages: Mutex<Vec<Stage>>,
    rows: Mutex<Vec<(FeedFile, u64)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.stages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn row_ticks(&self) -> Vec<(FeedFile, u64)> {
        self.rows.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl ProgressObserver for RecordingProgress {
    fn on_stage(&self, stage: Stage) {
        self.stages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(stage);
    }

    fn on_progress(&self, file: FeedFile, rows_read: u64) {
        self.rows
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((file, rows_read));
    }
}
