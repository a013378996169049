use crate::metrics::collector::MetricsCollector;
use crate::metrics::snapshot::MetricsSnapshot;
use crate::probe::{LinkCheckResult, Probe};
use crate::target::LinkTarget;
use futures::FutureExt;
use futures::stream::StreamExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Fixed-size worker pool running one check cycle at a time.
#[derive(Clone)]
pub struct CheckScheduler {
    concurrency: usize,
    metrics: Arc<MetricsCollector>,
}

impl CheckScheduler {
    pub fn new(concurrency: usize, metrics: Option<Arc<MetricsCollector>>) -> Self {
        Self {
            concurrency: concurrency.max(1),
            metrics: metrics.unwrap_or_else(|| Arc::new(MetricsCollector::new())),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probes every target exactly once and returns when all workers have exited.
    ///
    /// Results come back in completion order, not target order.
    pub async fn check_all(
        &self,
        targets: Vec<LinkTarget>,
        probe: Arc<dyn Probe>,
    ) -> Vec<LinkCheckResult> {
        if targets.is_empty() {
            return Vec::new();
        }

        let total = targets.len();
        let worker_count = self.concurrency.min(total);
        log::info!("Checking {} links with concurrency {}", total, worker_count);
        self.metrics.add_queued(total as u64);

        let targets = Arc::new(targets);
        let cursor = Arc::new(AtomicUsize::new(0));
        let (results_tx, results_rx) = mpsc::channel(total);

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let targets = targets.clone();
            let cursor = cursor.clone();
            let probe = probe.clone();
            let results_tx = results_tx.clone();
            let metrics = self.metrics.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(target) = targets.get(index) else {
                        break;
                    };

                    metrics.probe_started();
                    let result = match AssertUnwindSafe(probe.check(target)).catch_unwind().await {
                        Ok(result) => result,
                        Err(_) => {
                            log::error!("Probe panicked while checking {}", target.url);
                            LinkCheckResult::failed(target, "Probe panicked", None)
                        }
                    };
                    metrics.probe_finished(&result);

                    if !result.is_healthy() {
                        log::warn!("Link with problem: {} ({})", target.url, result.status);
                    }

                    if results_tx.send(result).await.is_err() {
                        break;
                    }
                }
                log::debug!("Worker {} finished.", worker_id);
            }));
        }

        // The collector below ends once every worker has dropped its sender.
        drop(results_tx);

        let results: Vec<LinkCheckResult> = tokio_stream::wrappers::ReceiverStream::new(results_rx)
            .collect()
            .await;

        for worker in workers {
            if let Err(e) = worker.await {
                log::error!("Check worker failed: {}", e);
            }
        }

        self.metrics.cycle_completed();
        log::info!("Link check finished. {} links checked.", results.len());
        results
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn watch_metrics(&self) -> watch::Receiver<MetricsSnapshot> {
        let (tx, rx) = watch::channel(self.metrics.snapshot());
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            loop {
                interval.tick().await;
                if tx.send(metrics.snapshot()).is_err() {
                    break;
                }
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::LinkStatus;
    use crate::target::Importance;
    use async_trait::async_trait;
    use std::collections::HashSet;

    /// Records how many checks overlap.
    #[derive(Default)]
    struct CountingProbe {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Probe for CountingProbe {
        async fn check(&self, target: &LinkTarget) -> LinkCheckResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let code = if target.url.contains("broken") { 404 } else { 200 };
            LinkCheckResult::from_status(target, code, None, Duration::from_millis(10))
        }
    }

    struct PanickingProbe;

    #[async_trait]
    impl Probe for PanickingProbe {
        async fn check(&self, target: &LinkTarget) -> LinkCheckResult {
            if target.url.contains("explode") {
                panic!("probe bug");
            }
            LinkCheckResult::from_status(target, 200, None, Duration::from_millis(1))
        }
    }

    fn targets(n: usize) -> Vec<LinkTarget> {
        (0..n)
            .map(|i| {
                let url = if i % 4 == 0 {
                    format!("http://host{}.example/broken", i)
                } else {
                    format!("http://host{}.example/", i)
                };
                LinkTarget::new(url, format!("Link {}", i), "API", Importance::High)
            })
            .collect()
    }

    #[tokio::test]
    async fn never_exceeds_concurrency() {
        for k in [1, 3, 5, 8] {
            let probe = Arc::new(CountingProbe::default());
            let scheduler = CheckScheduler::new(k, None);
            let results = scheduler.check_all(targets(23), probe.clone()).await;

            assert_eq!(results.len(), 23);
            assert!(probe.peak.load(Ordering::SeqCst) <= k, "peak exceeded {}", k);
            assert!(scheduler.get_metrics().peak_in_flight <= k as u64);
        }
    }

    #[tokio::test]
    async fn every_target_is_checked_exactly_once() {
        for k in [1, 2, 5, 50] {
            let input = targets(17);
            let probe = Arc::new(CountingProbe::default());
            let results = CheckScheduler::new(k, None)
                .check_all(input.clone(), probe.clone())
                .await;

            assert_eq!(probe.calls.load(Ordering::SeqCst), input.len());
            let expected: HashSet<_> = input.iter().map(|t| t.url.clone()).collect();
            let seen: HashSet<_> = results.iter().map(|r| r.url.clone()).collect();
            assert_eq!(results.len(), input.len());
            assert_eq!(seen, expected);
        }
    }

    #[tokio::test]
    async fn failures_do_not_abort_the_batch() {
        let results = CheckScheduler::new(2, None)
            .check_all(targets(8), Arc::new(CountingProbe::default()))
            .await;
        let broken = results.iter().filter(|r| r.status == LinkStatus::Broken).count();
        assert_eq!(broken, 2);
        assert_eq!(results.len(), 8);
    }

    #[tokio::test]
    async fn panicking_probe_becomes_broken_result() {
        let mut input = targets(3);
        input.push(LinkTarget::new("http://explode.example/", "Boom", "API", Importance::Low));

        let results = CheckScheduler::new(2, None).check_all(input, Arc::new(PanickingProbe)).await;
        assert_eq!(results.len(), 4);
        let exploded = results.iter().find(|r| r.url.contains("explode")).unwrap();
        assert_eq!(exploded.status, LinkStatus::Broken);
        assert_eq!(exploded.error.as_deref(), Some("Probe panicked"));
    }

    #[tokio::test]
    async fn empty_registry_returns_no_results() {
        let scheduler = CheckScheduler::new(5, None);
        let results = scheduler.check_all(vec![], Arc::new(CountingProbe::default())).await;
        assert!(results.is_empty());
        assert_eq!(scheduler.get_metrics().cycles_completed, 0);
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        assert_eq!(CheckScheduler::new(0, None).concurrency(), 1);
    }
}
