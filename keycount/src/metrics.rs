use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters shared by the line source and the workers of one run
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    lines_read: Arc<AtomicU64>,
    lines_processed: Arc<AtomicU64>,
    bytes_scanned: Arc<AtomicU64>,
    merges: Arc<AtomicU64>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a line handed to the channel
    pub fn record_line_read(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a line counted by a worker
    pub fn record_line_processed(&self, bytes: usize) {
        self.lines_processed.fetch_add(1, Ordering::Relaxed);
        self.bytes_scanned.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_merge(&self) {
        self.merges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> RunStats {
        RunStats {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            lines_processed: self.lines_processed.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Run stats:\n\
             Lines read/processed: {}/{}\n\
             Bytes scanned: {}\n\
             Merges: {}",
            stats.lines_read, stats.lines_processed, stats.bytes_scanned, stats.merges
        );
    }
}

/// Point-in-time copy of [`RunMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub lines_read: u64,
    pub lines_processed: u64,
    pub bytes_scanned: u64,
    pub merges: u64,
}
