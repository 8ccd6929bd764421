//! Terminal progress display for batch runs.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::client::ProtocolError;
use crate::models::RequestSpec;
use crate::orchestrator::BatchProgress;

/// `indicatif` bar advanced once per completed spec.
pub struct BarProgress {
    bar: ProgressBar,
    records: usize,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Self { bar, records: 0 }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchProgress for BarProgress {
    fn begin(&mut self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message("Querying");
    }

    fn attempt(&mut self, spec: &RequestSpec, attempt: u32) {
        if attempt > 1 {
            self.bar
                .set_message(format!("{} (attempt {})", spec.label(), attempt));
        } else {
            self.bar.set_message(spec.label());
        }
    }

    fn retry(&mut self, spec: &RequestSpec, error: &ProtocolError) {
        self.bar.println(format!(
            "{} {}: {}",
            style("↻").yellow(),
            spec.label(),
            error
        ));
    }

    fn item_done(&mut self, _spec: &RequestSpec, records: usize) {
        self.records += records;
        self.bar.inc(1);
    }

    fn finish(&mut self) {
        self.bar
            .finish_with_message(format!("{} proceedings", self.records));
    }
}
