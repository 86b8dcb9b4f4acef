//! Lock-free pipeline counters and periodic reporting
//!
//! Counters are updated from the pipeline stages and the geocoding fan-out
//! without locks. `report()` swaps the per-run counters to zero and returns a
//! snapshot; lifetime totals are only loaded.
//!
//! NOTE: All atomics use Relaxed ordering. These are statistical counters
//! only and must not drive control flow.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

#[derive(Debug)]
pub struct Metrics {
    /// Records received from the tracking source (reset on report)
    trackings_fetched: AtomicU64,
    /// Records dropped by the note filter (reset on report)
    dropped_note_filter: AtomicU64,
    /// Delivered records dropped as stale (reset on report)
    dropped_stale: AtomicU64,
    /// Records skipped as malformed (reset on report)
    malformed_records: AtomicU64,
    /// Aggregated packages produced (reset on report)
    packages_aggregated: AtomicU64,
    /// Address lookups that failed and were ignored (reset on report)
    geocode_failures: AtomicU64,
    /// Proactive events produced (reset on report)
    events_emitted: AtomicU64,
    /// Tracking source failures (monotonic)
    source_failures_total: AtomicU64,
    /// Pipeline runs completed (monotonic)
    runs_total: AtomicU64,
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            trackings_fetched: AtomicU64::new(0),
            dropped_note_filter: AtomicU64::new(0),
            dropped_stale: AtomicU64::new(0),
            malformed_records: AtomicU64::new(0),
            packages_aggregated: AtomicU64::new(0),
            geocode_failures: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
            source_failures_total: AtomicU64::new(0),
            runs_total: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    #[inline]
    pub fn record_trackings_fetched(&self, count: usize) {
        self.trackings_fetched.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_note_filtered(&self) {
        self.dropped_note_filter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_stale(&self) {
        self.dropped_stale.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_malformed(&self) {
        self.malformed_records.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_packages_aggregated(&self, count: usize) {
        self.packages_aggregated.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_geocode_failure(&self) {
        self.geocode_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_events_emitted(&self, count: usize) {
        self.events_emitted.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_source_failure(&self) {
        self.source_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_run(&self) {
        self.runs_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn geocode_failures(&self) -> u64 {
        self.geocode_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn malformed_records(&self) -> u64 {
        self.malformed_records.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn source_failures_total(&self) -> u64 {
        self.source_failures_total.load(Ordering::Relaxed)
    }

    /// Snapshot counters, resetting the per-run ones
    pub fn report(&self) -> MetricsSummary {
        MetricsSummary {
            trackings_fetched: self.trackings_fetched.swap(0, Ordering::Relaxed),
            dropped_note_filter: self.dropped_note_filter.swap(0, Ordering::Relaxed),
            dropped_stale: self.dropped_stale.swap(0, Ordering::Relaxed),
            malformed_records: self.malformed_records.swap(0, Ordering::Relaxed),
            packages_aggregated: self.packages_aggregated.swap(0, Ordering::Relaxed),
            geocode_failures: self.geocode_failures.swap(0, Ordering::Relaxed),
            events_emitted: self.events_emitted.swap(0, Ordering::Relaxed),
            source_failures_total: self.source_failures_total.load(Ordering::Relaxed),
            runs_total: self.runs_total.load(Ordering::Relaxed),
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSummary {
    pub trackings_fetched: u64,
    pub dropped_note_filter: u64,
    pub dropped_stale: u64,
    pub malformed_records: u64,
    pub packages_aggregated: u64,
    pub geocode_failures: u64,
    pub events_emitted: u64,
    pub source_failures_total: u64,
    pub runs_total: u64,
    /// Time since the collector was created
    pub elapsed_ms: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            trackings = self.trackings_fetched,
            note_filtered = self.dropped_note_filter,
            stale = self.dropped_stale,
            malformed = self.malformed_records,
            packages = self.packages_aggregated,
            geocode_failures = self.geocode_failures,
            events = self.events_emitted,
            source_failures = self.source_failures_total,
            runs = self.runs_total,
            elapsed_ms = self.elapsed_ms,
            "metrics"
        );
    }
}
