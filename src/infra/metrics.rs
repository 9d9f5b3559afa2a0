//! Pipeline run counters and summary reporting
//!
//! Counters are atomics so a shared handle can be read while a run is in
//! progress. All atomics use Relaxed ordering; these are statistics only.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default)]
pub struct PipelineMetrics {
    rows_read: AtomicU64,
    rows_skipped: AtomicU64,
    records: AtomicU64,
    stops: AtomicU64,
    clusters: AtomicU64,
    merged_stops: AtomicU64,
    elapsed_us: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_ingest(&self, rows_read: usize, rows_skipped: usize) {
        self.rows_read.fetch_add(rows_read as u64, Ordering::Relaxed);
        self.rows_skipped.fetch_add(rows_skipped as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_grouping(&self, records: usize, stops: usize, clusters: usize) {
        self.records.fetch_add(records as u64, Ordering::Relaxed);
        self.stops.fetch_add(stops as u64, Ordering::Relaxed);
        self.clusters.fetch_add(clusters as u64, Ordering::Relaxed);
        // Stops that ended up in someone else's cluster
        self.merged_stops.fetch_add(stops.saturating_sub(clusters) as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_elapsed(&self, elapsed: Duration) {
        self.elapsed_us.fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read.load(Ordering::Relaxed)
    }

    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped.load(Ordering::Relaxed)
    }

    pub fn clusters(&self) -> u64 {
        self.clusters.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> PipelineSummary {
        PipelineSummary {
            rows_read: self.rows_read.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            stops: self.stops.load(Ordering::Relaxed),
            clusters: self.clusters.load(Ordering::Relaxed),
            merged_stops: self.merged_stops.load(Ordering::Relaxed),
            elapsed_us: self.elapsed_us.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    pub rows_read: u64,
    pub rows_skipped: u64,
    pub records: u64,
    pub stops: u64,
    pub clusters: u64,
    pub merged_stops: u64,
    pub elapsed_us: u64,
}

impl PipelineSummary {
    /// Share of input rows that were discarded, 0.0 when nothing was read
    pub fn skip_ratio(&self) -> f64 {
        if self.rows_read == 0 {
            return 0.0;
        }
        self.rows_skipped as f64 / self.rows_read as f64
    }

    pub fn log(&self) {
        info!(
            rows_read = %self.rows_read,
            rows_skipped = %self.rows_skipped,
            skip_ratio = format!("{:.3}", self.skip_ratio()),
            records = %self.records,
            stops = %self.stops,
            clusters = %self.clusters,
            merged_stops = %self.merged_stops,
            elapsed_us = %self.elapsed_us,
            "pipeline_summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.rows_read(), 0);
        assert_eq!(metrics.report().skip_ratio(), 0.0);
    }

    #[test]
    fn test_record_and_report() {
        let metrics = PipelineMetrics::new();
        metrics.record_ingest(10, 2);
        metrics.record_grouping(8, 5, 3);
        metrics.record_elapsed(Duration::from_micros(1500));

        let summary = metrics.report();
        assert_eq!(summary.rows_read, 10);
        assert_eq!(summary.rows_skipped, 2);
        assert_eq!(summary.records, 8);
        assert_eq!(summary.stops, 5);
        assert_eq!(summary.clusters, 3);
        assert_eq!(summary.merged_stops, 2);
        assert_eq!(summary.elapsed_us, 1500);
        assert!((summary.skip_ratio() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_demo_grouping_does_not_underflow() {
        // Demo grouping can yield more clusters than input stops
        let metrics = PipelineMetrics::new();
        metrics.record_grouping(0, 0, 6);
        assert_eq!(metrics.report().merged_stops, 0);
        assert_eq!(metrics.clusters(), 6);
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = PipelineMetrics::new();
        metrics.record_ingest(3, 0);
        metrics.record_ingest(4, 1);
        assert_eq!(metrics.rows_read(), 7);
        assert_eq!(metrics.rows_skipped(), 1);
    }
}
