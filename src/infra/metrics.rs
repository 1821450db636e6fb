//! Lock-free scan counters and periodic reporting
//!
//! Uses atomics so the reader task and the UI never contend on a lock.
//!
//! NOTE: All atomics use Relaxed ordering; these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Lock-free metrics collector
pub struct Metrics {
    /// Lines received from the reader, including empty timeouts (monotonic)
    lines_received: AtomicU64,
    /// Non-empty lines that failed tag validation (monotonic)
    tags_rejected: AtomicU64,
    /// Scans appended to the log (monotonic)
    scans_logged: AtomicU64,
    /// Scans logged since last report (reset on report)
    scans_since_report: AtomicU64,
    /// Location selector changes (monotonic)
    location_changes: AtomicU64,
    /// Explicit direction state resets (monotonic)
    direction_resets: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            lines_received: AtomicU64::new(0),
            tags_rejected: AtomicU64::new(0),
            scans_logged: AtomicU64::new(0),
            scans_since_report: AtomicU64::new(0),
            location_changes: AtomicU64::new(0),
            direction_resets: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_line_received(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_tag_rejected(&self) {
        self.tags_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_scan_logged(&self) {
        self.scans_logged.fetch_add(1, Ordering::Relaxed);
        self.scans_since_report.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_location_change(&self) {
        self.location_changes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_direction_reset(&self) {
        self.direction_resets.fetch_add(1, Ordering::Relaxed);
    }

    /// Read counters without resetting the per-report window
    pub fn snapshot(&self) -> MetricsSummary {
        MetricsSummary {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            tags_rejected: self.tags_rejected.load(Ordering::Relaxed),
            scans_logged: self.scans_logged.load(Ordering::Relaxed),
            scans_since_report: self.scans_since_report.load(Ordering::Relaxed),
            location_changes: self.location_changes.load(Ordering::Relaxed),
            direction_resets: self.direction_resets.load(Ordering::Relaxed),
            scans_per_min: 0.0,
        }
    }

    /// Produce a summary and start a new report window
    pub fn report(&self) -> MetricsSummary {
        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let scans_since_report = self.scans_since_report.swap(0, Ordering::Relaxed);
        let minutes = elapsed.as_secs_f64() / 60.0;
        let scans_per_min =
            if minutes > 0.0 { scans_since_report as f64 / minutes } else { 0.0 };

        MetricsSummary { scans_since_report, scans_per_min, ..self.snapshot() }
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSummary {
    pub lines_received: u64,
    pub tags_rejected: u64,
    pub scans_logged: u64,
    pub scans_since_report: u64,
    pub location_changes: u64,
    pub direction_resets: u64,
    pub scans_per_min: f64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            lines_received = %self.lines_received,
            tags_rejected = %self.tags_rejected,
            scans_logged = %self.scans_logged,
            scans_since_report = %self.scans_since_report,
            scans_per_min = %format!("{:.1}", self.scans_per_min),
            location_changes = %self.location_changes,
            direction_resets = %self.direction_resets,
            "metrics"
        );
    }
}
