//! Progress bars for long scans and batch runs

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Progress over a known number of items.
///
/// Hidden unless enabled, so library callers without a terminal get no output.
pub struct ScanProgress {
    bar: ProgressBar,
    done: AtomicU64,
    failed: AtomicU64,
    start: Instant,
}

impl ScanProgress {
    pub fn new(total: u64, label: &str, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_prefix(label.to_string());

        Self {
            bar,
            done: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    /// Disabled progress that still counts
    pub fn hidden() -> Self {
        Self::new(0, "", false)
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn inc(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
        self.bar.inc(1);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        let done = self.done.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        self.bar.finish_with_message(format!(
            "{} done, {} failed in {:.1}s",
            done,
            failed,
            self.start.elapsed().as_secs_f64()
        ));
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}
