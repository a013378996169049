use crate::error::Result;
use crate::target::{Importance, LinkTarget};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::LOCATION;
use reqwest::{Client, redirect};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Healthy,
    Broken,
    Redirected,
    Pending,
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkStatus::Healthy => "healthy",
            LinkStatus::Broken => "broken",
            LinkStatus::Redirected => "redirected",
            LinkStatus::Pending => "pending",
        };
        f.write_str(name)
    }
}

/// Outcome of probing one target at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheckResult {
    pub url: String,
    pub status: LinkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    /// Milliseconds from request start until a response or failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    pub last_checked: DateTime<Utc>,
    pub context: String,
    pub importance: Importance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LinkCheckResult {
    /// Builds a result from a status code received within the timeout.
    pub fn from_status(
        target: &LinkTarget,
        status_code: u16,
        location: Option<String>,
        elapsed: Duration,
    ) -> Self {
        let status = classify_status(status_code);
        Self {
            url: target.url.clone(),
            status,
            status_code: Some(status_code),
            redirect_to: if status == LinkStatus::Redirected { location } else { None },
            response_time: Some(elapsed.as_millis() as u64),
            last_checked: Utc::now(),
            context: target.context.clone(),
            importance: target.importance,
            error: if status == LinkStatus::Broken {
                Some(format!("Status code: {}", status_code))
            } else {
                None
            },
        }
    }

    /// Builds a broken result for a failure that produced no status code.
    pub fn failed(
        target: &LinkTarget,
        error: impl Into<String>,
        elapsed: Option<Duration>,
    ) -> Self {
        Self {
            url: target.url.clone(),
            status: LinkStatus::Broken,
            status_code: None,
            redirect_to: None,
            response_time: elapsed.map(|d| d.as_millis() as u64),
            last_checked: Utc::now(),
            context: target.context.clone(),
            importance: target.importance,
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == LinkStatus::Healthy
    }
}

/// Maps an HTTP status code onto a link status. Redirects are never followed,
/// so any 3xx is reported as-is.
pub fn classify_status(status_code: u16) -> LinkStatus {
    match status_code {
        200..=299 => LinkStatus::Healthy,
        300..=399 => LinkStatus::Redirected,
        _ => LinkStatus::Broken,
    }
}

#[async_trait]
pub trait Probe: Send + Sync {
    /// Checks one target. Failures are reported in the result, never returned.
    async fn check(&self, target: &LinkTarget) -> LinkCheckResult;
}

/// Probe issuing a single GET with a fixed timeout and no redirect following.
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .user_agent("Link-Health/1.0")
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn describe_error(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("Request timed out after {}ms", self.timeout.as_millis())
        } else if err.is_connect() {
            format!("Connection failed: {}", error_chain(err))
        } else {
            error_chain(err)
        }
    }
}

/// Joins an error with all of its causes, skipping causes already
/// spelled out by an outer message.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, target: &LinkTarget) -> LinkCheckResult {
        log::debug!("Checking link: {}", target.url);

        let start_time = Instant::now();
        let outcome = self.client.get(&target.url).send().await;
        let elapsed = start_time.elapsed();

        match outcome {
            Ok(res) => {
                let location = res
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                LinkCheckResult::from_status(target, res.status().as_u16(), location, elapsed)
            }
            Err(e) => {
                let message = self.describe_error(&e);
                log::debug!("Error checking link {}: {}", target.url, message);
                LinkCheckResult::failed(target, message, Some(elapsed))
            }
        }
    }
}
