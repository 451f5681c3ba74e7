use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Counters for one engine run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferMetrics {
    /// Number of alignments processed
    pub units_processed: u64,
    /// Number of alignments that could not be read or parsed
    pub units_failed: u64,
    /// Number of reports built, failed reports included
    pub reports_built: u64,
    pub annotations_transferred: u64,
    pub gap_outcomes: u64,
    pub unmapped_outcomes: u64,
    /// Total processing time
    pub total_processing_time: Duration,
}

impl TransferMetrics {
    /// Fraction of outcomes that produced a transferred annotation
    pub fn transfer_ratio(&self) -> f64 {
        let total = self.annotations_transferred + self.gap_outcomes + self.unmapped_outcomes;
        if total == 0 {
            0.0
        } else {
            self.annotations_transferred as f64 / total as f64
        }
    }

    /// Calculate units per second
    pub fn units_per_second(&self) -> f64 {
        if self.total_processing_time.as_secs_f64() == 0.0 {
            0.0
        } else {
            self.units_processed as f64 / self.total_processing_time.as_secs_f64()
        }
    }
}

/// Thread-safe metrics collector
#[derive(Debug)]
pub struct MetricsCollector {
    units_processed: AtomicU64,
    units_failed: AtomicU64,
    reports_built: AtomicU64,
    annotations_transferred: AtomicU64,
    gap_outcomes: AtomicU64,
    unmapped_outcomes: AtomicU64,
    start_time: Instant,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            units_processed: AtomicU64::new(0),
            units_failed: AtomicU64::new(0),
            reports_built: AtomicU64::new(0),
            annotations_transferred: AtomicU64::new(0),
            gap_outcomes: AtomicU64::new(0),
            unmapped_outcomes: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record an alignment being processed
    pub fn record_unit(&self) {
        self.units_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_unit(&self) {
        self.units_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a report and its outcome counts
    pub fn record_report(&self, transferred: u64, gaps: u64, unmapped: u64) {
        self.reports_built.fetch_add(1, Ordering::Relaxed);
        self.annotations_transferred.fetch_add(transferred, Ordering::Relaxed);
        self.gap_outcomes.fetch_add(gaps, Ordering::Relaxed);
        self.unmapped_outcomes.fetch_add(unmapped, Ordering::Relaxed);
    }

    /// Get current metrics
    pub fn get_metrics(&self) -> TransferMetrics {
        TransferMetrics {
            units_processed: self.units_processed.load(Ordering::Relaxed),
            units_failed: self.units_failed.load(Ordering::Relaxed),
            reports_built: self.reports_built.load(Ordering::Relaxed),
            annotations_transferred: self.annotations_transferred.load(Ordering::Relaxed),
            gap_outcomes: self.gap_outcomes.load(Ordering::Relaxed),
            unmapped_outcomes: self.unmapped_outcomes.load(Ordering::Relaxed),
            total_processing_time: self.start_time.elapsed(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Performance timer for measuring operation durations
pub struct PerformanceTimer {
    start: Instant,
    operation: String,
}

impl PerformanceTimer {
    /// Start timing an operation
    pub fn start(operation: &str) -> Self {
        Self { start: Instant::now(), operation: operation.to_string() }
    }

    /// Finish timing and return the duration
    pub fn finish(self) -> Duration {
        self.start.elapsed()
    }

    /// Finish timing and log the result
    pub fn finish_and_log(self) -> Duration {
        let operation = self.operation.clone();
        let duration = self.finish();
        debug!(operation = %operation, elapsed = ?duration, "Operation finished");
        duration
    }
}
