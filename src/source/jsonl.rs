//! JSON Lines record source
//!
//! Serves records from a file holding one JSON record envelope per line.
//! Opening the file makes one counting pass to learn the total; pages are
//! then read strictly forward, so memory use is bounded by the page size.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use super::{Page, RecordSource};
use crate::error::{Result, SourceError};
use crate::model::{Record, decode_record};

/// Forward-only record source over a JSON Lines file
pub struct JsonLinesSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    /// Records consumed so far
    position: usize,
    /// Physical lines consumed so far
    line_no: usize,
    total: usize,
}

impl JsonLinesSource {
    /// Open a JSON Lines file and count its records
    ///
    /// Blank lines are ignored.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut counter = BufReader::new(File::open(&path).await?).lines();
        let mut total = 0;
        while let Some(line) = counter.next_line().await? {
            if !line.trim().is_empty() {
                total += 1;
            }
        }

        debug!("Opened {} with {} records", path.display(), total);

        let lines = BufReader::new(File::open(&path).await?).lines();
        Ok(Self {
            path,
            lines,
            position: 0,
            line_no: 0,
            total,
        })
    }

    /// Read and decode the next record, if any
    async fn next_record(&mut self) -> std::result::Result<Option<Record>, SourceError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| SourceError::FetchFailed {
                    offset: self.position,
                    limit: 1,
                    reason: format!("{}: {}", self.path.display(), e),
                })?;

            let Some(line) = line else {
                return Ok(None);
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let json: serde_json::Value =
                serde_json::from_str(&line).map_err(|e| SourceError::InvalidRecord {
                    line: self.line_no,
                    reason: e.to_string(),
                })?;
            let record = decode_record(&json, self.line_no)?;
            self.position += 1;
            return Ok(Some(record));
        }
    }
}

#[async_trait]
impl RecordSource for JsonLinesSource {
    async fn fetch_page(
        &mut self,
        offset: usize,
        limit: usize,
    ) -> std::result::Result<Page, SourceError> {
        if offset < self.position {
            return Err(SourceError::NotSeekable {
                requested: offset,
                position: self.position,
            });
        }

        while self.position < offset {
            if self.next_record().await?.is_none() {
                break;
            }
        }

        let mut records = Vec::with_capacity(limit.min(self.total));
        while records.len() < limit {
            match self.next_record().await? {
                Some(record) => records.push(record),
                None => break,
            }
        }

        Ok(Page {
            records,
            total: self.total,
        })
    }

    fn describe(&self) -> String {
        format!("{} ({} records)", self.path.display(), self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_lines(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn record_line(ts: &str, title: &str) -> String {
        serde_json::json!({
            "created_on": ts,
            "fields": [{"external_id": "title", "values": [{"value": title}]}]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_counts_and_pages_forward() {
        let a = record_line("2024-03-01 10:00:00", "a");
        let b = record_line("2024-03-01 11:00:00", "b");
        let c = record_line("2024-03-01 12:00:00", "c");
        let file = write_lines(&[&a, "", &b, &c]);

        let mut source = JsonLinesSource::open(file.path()).await.unwrap();

        let probe = source.fetch_page(0, 1).await.unwrap();
        assert_eq!(probe.total, 3);
        assert_eq!(probe.records.len(), 1);

        let page = source.fetch_page(1, 5).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[1].created_on.timestamp(), 1709294400);
    }

    #[tokio::test]
    async fn test_rewind_is_rejected() {
        let a = record_line("2024-03-01 10:00:00", "a");
        let b = record_line("2024-03-01 11:00:00", "b");
        let file = write_lines(&[&a, &b]);

        let mut source = JsonLinesSource::open(file.path()).await.unwrap();
        source.fetch_page(0, 2).await.unwrap();

        let err = source.fetch_page(0, 1).await.unwrap_err();
        assert!(matches!(
            err,
            SourceError::NotSeekable {
                requested: 0,
                position: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_skips_forward_to_offset() {
        let lines: Vec<String> = (0..4)
            .map(|i| record_line(&format!("2024-03-01 1{i}:00:00"), "x"))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = write_lines(&refs);

        let mut source = JsonLinesSource::open(file.path()).await.unwrap();
        let page = source.fetch_page(3, 10).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].created_on.format("%H").to_string(), "13");
    }

    #[tokio::test]
    async fn test_malformed_line_fails_whole_page() {
        let a = record_line("2024-03-01 10:00:00", "a");
        let file = write_lines(&[&a, "{not json"]);

        let mut source = JsonLinesSource::open(file.path()).await.unwrap();
        let err = source.fetch_page(0, 2).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidRecord { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_missing_file() {
        assert!(JsonLinesSource::open("/nonexistent/records.jsonl").await.is_err());
    }
}
