use crate::metrics::snapshot::MetricsSnapshot;
use crate::probe::{LinkCheckResult, LinkStatus};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;

/// Probe counters shared by every worker of every cycle.
#[derive(Clone)]
pub struct MetricsCollector {
    probes_queued: Arc<AtomicU64>,
    probes_completed: Arc<AtomicU64>,
    probes_healthy: Arc<AtomicU64>,
    probes_broken: Arc<AtomicU64>,
    probes_redirected: Arc<AtomicU64>,
    probes_in_flight: Arc<AtomicU64>,
    peak_in_flight: Arc<AtomicU64>,
    cycles_completed: Arc<AtomicU64>,
    total_response_time_ms: Arc<AtomicU64>,
    timed_probes: Arc<AtomicU64>,
    start_time: Arc<Instant>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            probes_queued: Arc::new(AtomicU64::new(0)),
            probes_completed: Arc::new(AtomicU64::new(0)),
            probes_healthy: Arc::new(AtomicU64::new(0)),
            probes_broken: Arc::new(AtomicU64::new(0)),
            probes_redirected: Arc::new(AtomicU64::new(0)),
            probes_in_flight: Arc::new(AtomicU64::new(0)),
            peak_in_flight: Arc::new(AtomicU64::new(0)),
            cycles_completed: Arc::new(AtomicU64::new(0)),
            total_response_time_ms: Arc::new(AtomicU64::new(0)),
            timed_probes: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Instant::now()),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_queued(&self, count: u64) {
        self.probes_queued.fetch_add(count, Ordering::SeqCst);
    }

    pub fn probe_started(&self) {
        let now = self.probes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    pub fn probe_finished(&self, result: &LinkCheckResult) {
        self.probes_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.probes_completed.fetch_add(1, Ordering::SeqCst);

        let counter = match result.status {
            LinkStatus::Healthy => &self.probes_healthy,
            LinkStatus::Broken => &self.probes_broken,
            LinkStatus::Redirected => &self.probes_redirected,
            LinkStatus::Pending => return,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        if let Some(ms) = result.response_time {
            self.timed_probes.fetch_add(1, Ordering::SeqCst);
            self.total_response_time_ms.fetch_add(ms, Ordering::SeqCst);
        }
    }

    pub fn cycle_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let queued = self.probes_queued.load(Ordering::SeqCst);
        let completed = self.probes_completed.load(Ordering::SeqCst);
        let timed = self.timed_probes.load(Ordering::SeqCst);
        let total_time = self.total_response_time_ms.load(Ordering::SeqCst);

        let completion_rate = if queued > 0 {
            (completed as f64 / queued as f64) * 100.0
        } else {
            0.0
        };

        let avg_response_time_ms = if timed > 0 { total_time / timed } else { 0 };

        let elapsed = self.start_time.elapsed().as_secs_f64();

        MetricsSnapshot {
            probes_queued: queued,
            probes_completed: completed,
            probes_healthy: self.probes_healthy.load(Ordering::SeqCst),
            probes_broken: self.probes_broken.load(Ordering::SeqCst),
            probes_redirected: self.probes_redirected.load(Ordering::SeqCst),
            probes_in_flight: self.probes_in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
            cycles_completed: self.cycles_completed.load(Ordering::SeqCst),
            completion_rate,
            avg_response_time_ms,
            probes_per_second: if elapsed > 0.0 {
                completed as f64 / elapsed
            } else {
                0.0
            },
            elapsed_seconds: elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Importance, LinkTarget};
    use std::time::Duration;

    #[test]
    fn snapshot_tracks_statuses_and_peak() {
        let metrics = MetricsCollector::new();
        let target = LinkTarget::new("http://a.example/", "A", "API", Importance::Low);
        metrics.add_queued(2);

        metrics.probe_started();
        metrics.probe_started();
        let healthy = LinkCheckResult::from_status(&target, 200, None, Duration::from_millis(10));
        metrics.probe_finished(&healthy);
        metrics.probe_finished(&LinkCheckResult::failed(&target, "boom", None));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.probes_completed, 2);
        assert_eq!(snapshot.probes_healthy, 1);
        assert_eq!(snapshot.probes_broken, 1);
        assert_eq!(snapshot.probes_in_flight, 0);
        assert_eq!(snapshot.peak_in_flight, 2);
        assert_eq!(snapshot.avg_response_time_ms, 10);
        assert_eq!(snapshot.completion_rate, 100.0);
    }
}
