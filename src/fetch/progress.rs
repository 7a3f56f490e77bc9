//! Progress tracking for collection scans
//!
//! The total number of matching rows is unknown until the scan ends, so the
//! tracker shows a spinner with running row and page counts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress tracker for a paginated fetch
pub struct ProgressTracker {
    /// Rows accumulated so far
    rows: AtomicU64,
    /// Start time of the operation
    start_time: Instant,
    /// Spinner (optional, can be disabled)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to draw a spinner on stderr
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.green} {pos} rows {msg}")
            {
                bar.set_style(style);
            }
            bar
        });

        Self {
            rows: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Record the running totals after a page arrives
    pub fn update(&self, rows: u64, pages: u64) {
        self.rows.store(rows, Ordering::Relaxed);

        if let Some(ref bar) = self.bar {
            bar.set_position(rows);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = rows as f64 / elapsed;
                bar.set_message(format!("({} pages, {:.0} rows/sec)", pages, speed));
            }
        }
    }

    /// Rows recorded by the last update
    pub fn rows(&self) -> u64 {
        self.rows.load(Ordering::Relaxed)
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
