use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounters {
    pub items_written: u64,
    pub batches_written: u64,
    pub items_dropped: u64,
    pub batches_dropped: u64,
    pub marshal_errors: u64,
    pub retries: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub counters: ProgressCounters,
    pub elapsed: Duration,
    pub items_per_second: f64,
}

impl ProgressReport {
    pub fn items_written(&self) -> u64 {
        self.counters.items_written
    }

    pub fn has_drops(&self) -> bool {
        self.counters.items_dropped > 0 || self.counters.batches_dropped > 0
    }
}

/// Shared accumulator of write outcomes, cloned into every worker.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    started_at: Instant,
    counters: Arc<Mutex<ProgressCounters>>,
}

impl ProgressTracker {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
            counters: Arc::new(Mutex::new(ProgressCounters::default())),
        }
    }

    pub fn record_written(&self, items: usize) {
        let mut counters = self.counters.lock();
        counters.items_written += items as u64;
        counters.batches_written += 1;
    }

    pub fn record_dropped(&self, items: usize) {
        let mut counters = self.counters.lock();
        counters.items_dropped += items as u64;
        counters.batches_dropped += 1;
    }

    pub fn record_marshal_errors(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.counters.lock().marshal_errors += count as u64;
    }

    pub fn record_retry(&self) {
        self.counters.lock().retries += 1;
    }

    pub fn snapshot(&self) -> ProgressCounters {
        *self.counters.lock()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn report(&self) -> ProgressReport {
        let counters = self.snapshot();
        let elapsed = self.elapsed();
        ProgressReport {
            counters,
            elapsed,
            items_per_second: throughput(counters.items_written, elapsed),
        }
    }
}

pub fn throughput(items: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    items as f64 / secs
}

#[cfg(test)]
mod tests {
    use super::{throughput, ProgressTracker};
    use std::time::Duration;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let tracker = ProgressTracker::start();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        tracker.record_written(3);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }

        let counters = tracker.snapshot();
        assert_eq!(counters.items_written, 24_000);
        assert_eq!(counters.batches_written, 8_000);
    }

    #[test]
    fn drops_and_marshal_errors_are_tracked_separately() {
        let tracker = ProgressTracker::start();
        tracker.record_written(25);
        tracker.record_dropped(7);
        tracker.record_marshal_errors(0);
        tracker.record_marshal_errors(2);
        tracker.record_retry();

        let report = tracker.report();
        assert_eq!(report.items_written(), 25);
        assert_eq!(report.counters.items_dropped, 7);
        assert_eq!(report.counters.batches_dropped, 1);
        assert_eq!(report.counters.marshal_errors, 2);
        assert_eq!(report.counters.retries, 1);
        assert!(report.has_drops());
        assert_eq!(report.counters, tracker.snapshot());
        assert_eq!(report.items_per_second, throughput(25, report.elapsed));
    }

    #[test]
    fn throughput_handles_zero_elapsed() {
        assert_eq!(throughput(10, Duration::ZERO), 0.0);
        assert!((throughput(10, Duration::from_secs(2)) - 5.0).abs() < 1e-9);
    }
}
