use super::OutputHandler;
use crate::error::Result;
use crate::probe::LinkCheckResult;
use crate::stats::LinkHealthStats;
use async_trait::async_trait;
use std::path::PathBuf;

const HEADERS: [&str; 9] = [
    "url",
    "status",
    "statusCode",
    "redirectTo",
    "responseTime",
    "lastChecked",
    "context",
    "importance",
    "error",
];

pub struct CsvOutput {
    writer: csv::Writer<std::fs::File>,
    headers_written: bool,
}

impl CsvOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let writer = csv::Writer::from_path(path)?;

        Ok(Self {
            writer,
            headers_written: false,
        })
    }
}

fn optional<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

#[async_trait]
impl OutputHandler for CsvOutput {
    async fn write(&mut self, result: &LinkCheckResult) -> Result<()> {
        if !self.headers_written {
            self.writer.write_record(HEADERS)?;
            self.headers_written = true;
        }

        self.writer.write_record([
            result.url.clone(),
            result.status.to_string(),
            optional(&result.status_code),
            optional(&result.redirect_to),
            optional(&result.response_time),
            result.last_checked.to_rfc3339(),
            result.context.clone(),
            result.importance.to_string(),
            optional(&result.error),
        ])?;
        Ok(())
    }

    async fn close(&mut self, _stats: &LinkHealthStats) -> Result<()> {
        if !self.headers_written {
            self.writer.write_record(HEADERS)?;
        }
        self.writer.flush()?;
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
    async fn writes_header_and_one_row_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let target =
            LinkTarget::new("http://redir.example/", "Redir", "Main Menu", Importance::Medium);
        let location = Some("http://dest.example/".into());
        let result = LinkCheckResult::from_status(&target, 302, location, Duration::from_millis(9));

        let mut output = CsvOutput::new(path.clone()).unwrap();
        output.write(&result).await.unwrap();
        output.close(&summarize(std::slice::from_ref(&result))).await.unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), HEADERS.len());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "redirected");
        assert_eq!(&rows[0][2], "302");
        assert_eq!(&rows[0][3], "http://dest.example/");
        assert_eq!(&rows[0][8], "");
    }
}
