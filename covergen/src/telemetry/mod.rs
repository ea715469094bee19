//! Run progress reporting.
//!
//! The [`ProgressReporter`] keeps a lock-free running total of coverage
//! records and logs a progress line each time the total crosses a multiple
//! of the reporting interval. It has no effect on results; workers still
//! keep their own tallies, which are the authoritative count at run end.
//!
//! ```text
//! worker tallies ──► record(n) ──► AtomicU64 total ──► info!("Progress ...")
//!                                  (fetch_add)          every `interval`
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::info;

/// Default number of records between progress lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// Point-in-time view of a reporter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub records: u64,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records as f64 / secs
        } else {
            0.0
        }
    }
}

/// Periodic progress logger over a shared counter.
#[derive(Debug)]
pub struct ProgressReporter {
    interval: u64,
    total: AtomicU64,
    started: Instant,
}

impl ProgressReporter {
    /// Creates a reporter logging every `interval` records (0 disables logging).
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            total: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Adds `records` to the running total.
    ///
    /// Returns true if this call crossed a reporting boundary and logged.
    pub fn record(&self, records: u64) -> bool {
        if records == 0 {
            return false;
        }
        let before = self.total.fetch_add(records, Ordering::Relaxed);
        let after = before + records;

        if self.interval == 0 || before / self.interval == after / self.interval {
            return false;
        }

        let elapsed = self.started.elapsed();
        info!(
            records = after,
            elapsed_secs = format_args!("{:.1}", elapsed.as_secs_f64()),
            "Progress: {} records",
            after
        );
        true
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            records: self.total(),
            elapsed: self.started.elapsed(),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_reports_on_crossing_interval() {
        let reporter = ProgressReporter::new(10);

        assert!(!reporter.record(4));
        assert!(!reporter.record(5));
        assert!(reporter.record(1));
        assert!(!reporter.record(9));
        // A single large step crossing several boundaries reports once.
        assert!(reporter.record(35));
        assert_eq!(reporter.total(), 54);
    }

    #[test]
    fn test_zero_interval_never_reports() {
        let reporter = ProgressReporter::new(0);
        assert!(!reporter.record(1_000_000));
        assert_eq!(reporter.total(), 1_000_000);
    }

    #[test]
    fn test_zero_records_is_noop() {
        let reporter = ProgressReporter::new(1);
        assert!(!reporter.record(0));
        assert_eq!(reporter.snapshot().records, 0);
    }

    #[test]
    fn test_concurrent_records_sum_exactly() {
        let reporter = Arc::new(ProgressReporter::new(1000));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reporter = Arc::clone(&reporter);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        reporter.record(3);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(reporter.total(), 8 * 10_000 * 3);
    }
}
