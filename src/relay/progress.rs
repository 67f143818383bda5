//! Progress messages for large downloads.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::reader::ProgressSink;
use crate::report::ReportContext;

const MIB: u64 = 1024 * 1024;

/// Number of progress-bar segments for a file of `size` bytes
///
/// Larger files get coarser bars so the number of message edits stays
/// bounded.
pub(crate) fn bar_segments(size: u64) -> u64 {
    match size {
        s if s <= 200 * MIB => 20,
        s if s <= 1024 * MIB => 10,
        _ => 5,
    }
}

/// Render a bar of `segments` cells, filled up to `percent`
pub(crate) fn progress_bar(percent: f64, segments: u64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * segments as f64).floor() as u64;
    let filled = filled.min(segments) as usize;
    let empty = segments as usize - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Edits the task's status message as the download advances
///
/// Silent for files below `threshold`; above it, edits only when progress
/// crosses the next `100 / segments` percent boundary.
pub(crate) struct MessageProgress {
    report: ReportContext,
    label: String,
    size: u64,
    threshold: u64,
    segments: u64,
    /// Highest boundary already reported
    last_boundary: AtomicU64,
}

impl MessageProgress {
    pub(crate) fn new(report: ReportContext, label: String, size: u64, threshold: u64) -> Self {
        Self {
            report,
            label,
            size,
            threshold,
            segments: bar_segments(size),
            last_boundary: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ProgressSink for MessageProgress {
    async fn on_progress(&self, bytes_read: u64, total: u64) {
        if total == 0 {
            return;
        }

        let percent = bytes_read as f64 / total as f64 * 100.0;
        tracing::trace!(task = %self.label, "Downloading: {:.2}%", percent);

        if self.size < self.threshold {
            return;
        }

        let step = 100 / self.segments;
        let boundary = percent as u64 / step;
        if boundary <= self.last_boundary.fetch_max(boundary, Ordering::SeqCst) {
            return;
        }

        let text = format!(
            "Downloading: {}\n[{}] {:.2}%",
            self.label,
            progress_bar(percent, self.segments),
            percent
        );
        self.report.update(&text).await;
    }
}
