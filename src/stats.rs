use crate::probe::{LinkCheckResult, LinkStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate over one result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkHealthStats {
    pub total: usize,
    pub healthy: usize,
    pub broken: usize,
    pub redirected: usize,
    pub pending: usize,
    /// Mean of the defined response times in milliseconds, `0` when none are defined.
    pub avg_response_time: f64,
    pub last_full_check: DateTime<Utc>,
}

impl LinkHealthStats {
    pub fn is_consistent_with(&self, results: &[LinkCheckResult]) -> bool {
        self.total == results.len()
            && self.healthy + self.broken + self.redirected + self.pending == self.total
    }
}

/// Reduces a result set in a single pass. `last_full_check` is the time of
/// aggregation, not any individual result's timestamp.
pub fn summarize(results: &[LinkCheckResult]) -> LinkHealthStats {
    let mut stats = LinkHealthStats {
        total: results.len(),
        healthy: 0,
        broken: 0,
        redirected: 0,
        pending: 0,
        avg_response_time: 0.0,
        last_full_check: Utc::now(),
    };

    let mut timed = 0u64;
    let mut total_time = 0u64;

    for result in results {
        match result.status {
            LinkStatus::Healthy => stats.healthy += 1,
            LinkStatus::Broken => stats.broken += 1,
            LinkStatus::Redirected => stats.redirected += 1,
            LinkStatus::Pending => stats.pending += 1,
        }
        if let Some(ms) = result.response_time {
            timed += 1;
            total_time += ms;
        }
    }

    if timed > 0 {
        stats.avg_response_time = total_time as f64 / timed as f64;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Importance, LinkTarget};
    use std::time::Duration;

    fn target(url: &str) -> LinkTarget {
        LinkTarget::new(url, url, "API", Importance::Medium)
    }

    fn checked(url: &str, status_code: u16, millis: u64) -> LinkCheckResult {
        LinkCheckResult::from_status(&target(url), status_code, None, Duration::from_millis(millis))
    }

    #[test]
    fn empty_set_yields_zero_average() {
        let stats = summarize(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.avg_response_time, 0.0);
        assert!(!stats.avg_response_time.is_nan());
    }

    #[test]
    fn results_without_response_time_yield_zero_average() {
        let results = vec![
            LinkCheckResult::failed(&target("http://a.example/"), "dns", None),
            LinkCheckResult::failed(&target("http://b.example/"), "dns", None),
        ];
        let stats = summarize(&results);
        assert_eq!(stats.broken, 2);
        assert_eq!(stats.avg_response_time, 0.0);
    }

    #[test]
    fn counts_partition_the_total() {
        let results = vec![
            checked("http://a.example/", 200, 40),
            checked("http://b.example/", 301, 20),
            checked("http://c.example/", 500, 30),
            LinkCheckResult::failed(&target("http://d.example/"), "refused", None),
        ];
        let stats = summarize(&results);
        assert_eq!(stats.total, 4);
        assert_eq!((stats.healthy, stats.redirected, stats.broken, stats.pending), (1, 1, 2, 0));
        assert!(stats.is_consistent_with(&results));
        assert_eq!(stats.avg_response_time, 30.0);
    }

    #[test]
    fn stats_serialize_in_camel_case() {
        let json = serde_json::to_value(summarize(&[])).unwrap();
        assert!(json.get("avgResponseTime").is_some());
        assert!(json.get("lastFullCheck").is_some());
    }
}
