//! Stale-while-revalidate snapshot of the most recent check cycle.
//!
//! Reads never wait on the network. The snapshot is published through a
//! `watch` channel as one `Arc<CacheEntry>`, so a reader sees either the old
//! or the new cycle in full.

use crate::error::{Error, Result};
use crate::probe::{LinkCheckResult, Probe};
use crate::scheduler::CheckScheduler;
use crate::stats::{LinkHealthStats, summarize};
use crate::target::TargetProvider;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_STALENESS: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub results: Vec<LinkCheckResult>,
    pub stats: Option<LinkHealthStats>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn from_results(results: Vec<LinkCheckResult>) -> Self {
        let stats = summarize(&results);
        Self {
            last_checked: Some(stats.last_full_check),
            stats: Some(stats),
            results,
        }
    }

    /// True when empty or older than `threshold` at `now`.
    pub fn is_stale(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        match self.last_checked {
            None => true,
            Some(checked) => match (now - checked).to_std() {
                Ok(age) => age > threshold,
                // Timestamp in the future: not stale.
                Err(_) => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Started,
    AlreadyRunning,
}

/// What a read returns.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub entry: Arc<CacheEntry>,
    pub is_cached: bool,
    /// Set when the read found the snapshot stale and asked for a refresh.
    pub refresh: Option<RefreshTrigger>,
}

struct Inner {
    provider: Arc<dyn TargetProvider>,
    probe: Arc<dyn Probe>,
    scheduler: CheckScheduler,
    staleness: Duration,
    snapshot: watch::Sender<Arc<CacheEntry>>,
    refreshing: AtomicBool,
}

/// Owns the snapshot and runs at most one background refresh at a time.
#[derive(Clone)]
pub struct LinkHealthCache {
    inner: Arc<Inner>,
}

/// Clears the in-flight flag when the refresh task ends, including by panic.
struct RefreshGuard(Arc<Inner>);

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.0.refreshing.store(false, Ordering::Release);
    }
}

impl LinkHealthCache {
    pub fn new(
        provider: Arc<dyn TargetProvider>,
        probe: Arc<dyn Probe>,
        scheduler: CheckScheduler,
        staleness: Duration,
    ) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(CacheEntry::default()));
        Self {
            inner: Arc::new(Inner {
                provider,
                probe,
                scheduler,
                staleness,
                snapshot,
                refreshing: AtomicBool::new(false),
            }),
        }
    }

    pub fn scheduler(&self) -> &CheckScheduler {
        &self.inner.scheduler
    }

    pub fn snapshot(&self) -> Arc<CacheEntry> {
        self.inner.snapshot.borrow().clone()
    }

    /// Receives every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CacheEntry>> {
        self.inner.snapshot.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.load(Ordering::Acquire)
    }

    /// Returns the current snapshot immediately, scheduling a background
    /// refresh when it is empty or stale. Must be called inside a Tokio runtime.
    pub fn get_results(&self) -> CacheRead {
        let entry = self.snapshot();
        let refresh = if entry.is_stale(self.inner.staleness, Utc::now()) {
            Some(self.request_check())
        } else {
            None
        };

        CacheRead {
            entry,
            is_cached: true,
            refresh,
        }
    }

    /// Starts a background refresh unless one is already running.
    pub fn request_check(&self) -> RefreshTrigger {
        if self
            .inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Link check already in progress; trigger ignored");
            return RefreshTrigger::AlreadyRunning;
        }

        let cache = self.clone();
        let guard = RefreshGuard(self.inner.clone());
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = cache.run_cycle().await {
                log::error!("Error during link check cycle: {}", e);
            }
        });

        RefreshTrigger::Started
    }

    async fn run_cycle(&self) -> Result<()> {
        log::info!("Starting system link check...");

        let targets = self.inner.provider.list_targets()?;
        if targets.is_empty() {
            return Err(Error::Targets("registry is empty".to_string()));
        }
        let results = self
            .inner
            .scheduler
            .check_all(targets, self.inner.probe.clone())
            .await;
        let entry = CacheEntry::from_results(results);

        if let Some(stats) = &entry.stats {
            log::info!(
                "Link check complete: {} total, {} healthy, {} broken, {} redirected, avg {:.1}ms",
                stats.total,
                stats.healthy,
                stats.broken,
                stats.redirected,
                stats.avg_response_time
            );
        }

        self.publish(entry);
        Ok(())
    }

    fn publish(&self, entry: CacheEntry) {
        self.inner.snapshot.send_replace(Arc::new(entry));
    }

    /// Triggers a refresh on every tick of `period` until the cache is dropped.
    pub fn spawn_periodic_refresh(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                LinkHealthCache { inner }.request_check();
            }
        })
    }
}
