use indicatif::{ProgressBar, ProgressStyle};
use tt_feed::FeedFile;
use tt_reconcile::{ProgressObserver, Stage};

/// Spinner on stderr showing the current stage and rows read.
pub struct SpinnerProgress {
    pb: ProgressBar,
}

impl SpinnerProgress {
    pub fn new(enabled: bool) -> Self {
        let pb = if enabled {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        // The template is a literal; a parse failure leaves the default style.
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {prefix:.bold} {msg}")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { pb }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl ProgressObserver for SpinnerProgress {
    fn on_stage(&self, stage: Stage) {
        self.pb.set_prefix(stage.to_string());
        self.pb.set_message("");
    }

    fn on_progress(&self, file: FeedFile, rows_read: u64) {
        self.pb.set_message(format!("{file}: {rows_read} rows"));
    }
}
