use super::OutputHandler;
use crate::error::Result;
use crate::probe::LinkCheckResult;
use crate::stats::LinkHealthStats;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Streams `{"results":[...],"stats":{...}}` to a file.
pub struct JsonOutput {
    file: File,
    first: bool,
}

impl JsonOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        write!(file, "{{\"results\":[")?;

        Ok(Self {
            file,
            first: true,
        })
    }
}

#[async_trait]
impl OutputHandler for JsonOutput {
    async fn write(&mut self, result: &LinkCheckResult) -> Result<()> {
        if !self.first {
            write!(self.file, ",")?;
        } else {
            self.first = false;
        }

        serde_json::to_writer(&mut self.file, result)?;
        Ok(())
    }

    async fn close(&mut self, stats: &LinkHealthStats) -> Result<()> {
        write!(self.file, "],\"stats\":")?;
        serde_json::to_writer(&mut self.file, stats)?;
        write!(self.file, "}}")?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::summarize;
    use crate::target::{Importance, LinkTarget};
    use std::time::Duration;

    #[tokio::test]
    async fn writes_a_single_json_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let target = LinkTarget::new("http://ok.example/", "Ok", "API", Importance::High);
        let results = vec![
            LinkCheckResult::from_status(&target, 200, None, Duration::from_millis(50)),
            LinkCheckResult::failed(&target, "Connection failed", None),
        ];

        let mut output = JsonOutput::new(path.clone()).unwrap();
        for result in &results {
            output.write(result).await.unwrap();
        }
        output.close(&summarize(&results)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let report: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(report["results"].as_array().unwrap().len(), 2);
        assert_eq!(report["stats"]["total"], 2);
        assert_eq!(report["stats"]["broken"], 1);
    }
}
