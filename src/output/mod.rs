use crate::error::Result;
use crate::probe::LinkCheckResult;
use crate::stats::LinkHealthStats;
use async_trait::async_trait;

pub mod console;
pub mod json;
pub mod csv;

/// Sink for the report of a one-shot check cycle.
#[async_trait]
pub trait OutputHandler: Send + Sync {
    async fn write(&mut self, result: &LinkCheckResult) -> Result<()>;
    async fn close(&mut self, _stats: &LinkHealthStats) -> Result<()> {
        Ok(())
    }
}
