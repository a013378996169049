pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod output;
pub mod probe;
pub mod scheduler;
pub mod server;
pub mod stats;
pub mod target;

pub use cache::{CacheEntry, CacheRead, LinkHealthCache, RefreshTrigger};
pub use error::{Error, Result};
pub use metrics::collector::MetricsCollector;
pub use metrics::snapshot::MetricsSnapshot;
pub use probe::{HttpProbe, LinkCheckResult, LinkStatus, Probe};
pub use scheduler::CheckScheduler;
pub use stats::{LinkHealthStats, summarize};
pub use target::{Importance, LinkTarget, StaticTargets, TargetProvider};
