use super::OutputHandler;
use crate::error::{Error, Result};
use crate::probe::{LinkCheckResult, LinkStatus};
use crate::stats::LinkHealthStats;
use async_trait::async_trait;
use indicatif::MultiProgress;
use std::sync::Arc;

pub struct ConsoleOutput {
    multi: Option<Arc<MultiProgress>>,
}

impl ConsoleOutput {
    pub fn new(multi: Option<Arc<MultiProgress>>) -> Self {
        Self { multi }
    }

    fn println(&self, line: &str) -> Result<()> {
        if let Some(multi) = &self.multi {
            multi.println(line).map_err(|e| Error::Internal(e.to_string()))?;
        } else {
            println!("{}", line);
        }
        Ok(())
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(None)
    }
}

pub(crate) fn format_result(result: &LinkCheckResult) -> String {
    let icon = match result.status {
        LinkStatus::Healthy => "✅",
        LinkStatus::Redirected => "↪️",
        LinkStatus::Broken => "❌",
        LinkStatus::Pending => "⏳",
    };

    let mut line = format!("{} [{}] {} ({})", icon, result.importance, result.url, result.context);
    if let Some(code) = result.status_code {
        line.push_str(&format!(" {}", code));
    }
    if let Some(ms) = result.response_time {
        line.push_str(&format!(" {}ms", ms));
    }
    if let Some(to) = &result.redirect_to {
        line.push_str(&format!(" -> {}", to));
    }
    if let Some(error) = &result.error {
        line.push_str(&format!(" - {}", error));
    }
    line
}

#[async_trait]
impl OutputHandler for ConsoleOutput {
    async fn write(&mut self, result: &LinkCheckResult) -> Result<()> {
        self.println(&format_result(result))
    }

    async fn close(&mut self, stats: &LinkHealthStats) -> Result<()> {
        self.println(&format!(
            "Total: {} | Healthy: {} | Redirected: {} | Broken: {} | Avg: {:.1}ms",
            stats.total, stats.healthy, stats.redirected, stats.broken, stats.avg_response_time
        ))
    }
}
