use crate::target::{Importance, LinkTarget};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MonitorConfig {
    #[serde(default = "default_name")]
    #[validate(length(min = 1))]
    pub name: String,

    /// Base for targets registered with a relative URL.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub targets: Vec<TargetConfig>,

    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1))]
    pub concurrency: usize,

    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 1))]
    pub request_timeout_ms: u64,

    #[serde(default = "default_staleness")]
    pub staleness_secs: u64,

    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,

    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    pub label: String,
    #[serde(default = "default_context")]
    pub context: String,
    #[serde(default = "default_importance")]
    pub importance: Importance,
}

impl From<TargetConfig> for LinkTarget {
    fn from(config: TargetConfig) -> Self {
        LinkTarget::new(config.url, config.label, config.context, config.importance)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console,
    Json {
        path: String,
    },
    Csv {
        path: String,
    },
}

fn default_name() -> String {
    "link-health".to_string()
}

fn default_concurrency() -> usize {
    crate::scheduler::DEFAULT_CONCURRENCY
}

fn default_request_timeout() -> u64 {
    crate::probe::DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

fn default_staleness() -> u64 {
    crate::cache::DEFAULT_STALENESS.as_secs()
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_context() -> String {
    "General".to_string()
}

fn default_importance() -> Importance {
    Importance::Medium
}
