//! Streaming delimited-text writer
//!
//! The writer is the single consumer of the record channel. It first lets a
//! [`SchemaCollector`] consume the prefix window, writes the header, then
//! writes the buffered prefix records followed by everything still arriving,
//! one line per record and in arrival order.

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::progress::ProgressTracker;
use super::projector::RowProjector;
use super::schema::{Schema, SchemaCollector};
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::formatter::ValueFormatter;
use crate::model::Record;

/// What a completed drain produced
#[derive(Debug, Clone)]
pub struct WriteSummary {
    /// Number of data lines written
    pub rows_written: u64,
    /// Columns of the header, after the preamble
    pub schema: Schema,
}

/// Writer for the delimited text table
pub struct StreamingWriter {
    delimiter: String,
    schema_prefix: usize,
    projector: RowProjector,
    tracker: ProgressTracker,
}

impl StreamingWriter {
    /// Create a writer from the export settings
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            delimiter: config.delimiter.clone(),
            schema_prefix: config.schema_prefix,
            projector: RowProjector::new(ValueFormatter::new(config.delimiter.clone())),
            tracker: ProgressTracker::hidden(),
        }
    }

    /// Report written rows to `tracker`
    pub fn with_progress(mut self, tracker: ProgressTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Drain the channel into `sink`
    ///
    /// Returns once the channel is closed and every record has been written.
    /// The sink is flushed and shut down on every path, including write
    /// failures. Only sink failures are errors; an upstream that stops early
    /// simply yields a shorter table.
    ///
    /// # Arguments
    /// * `rx` - Receiving end of the record channel
    /// * `sink` - Output destination
    ///
    /// # Returns
    /// * `Result<WriteSummary>` - Rows written and the header schema
    pub async fn drain<W>(&self, mut rx: mpsc::Receiver<Record>, sink: W) -> Result<WriteSummary>
    where
        W: AsyncWrite + Unpin,
    {
        let mut out = BufWriter::new(sink);

        let written = self.write_table(&mut rx, &mut out).await;

        // Unblock a producer still waiting on a full channel
        rx.close();

        let closed: Result<()> = match out.shutdown().await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Buffered bytes could not be flushed; still release the sink
                let _ = out.get_mut().shutdown().await;
                Err(ExportError::SinkFailed(format!("Failed to close output: {}", e)).into())
            }
        };

        self.tracker.finish();

        let summary = written?;
        closed?;

        info!(
            "Wrote {} rows with {} columns",
            summary.rows_written,
            summary.schema.len()
        );
        Ok(summary)
    }

    async fn write_table<W>(
        &self,
        rx: &mut mpsc::Receiver<Record>,
        out: &mut BufWriter<W>,
    ) -> Result<WriteSummary>
    where
        W: AsyncWrite + Unpin,
    {
        let (schema, prefix) = SchemaCollector::new(self.schema_prefix).collect(rx).await;

        self.write_line(out, &self.projector.header(&schema)).await?;
        debug!("Wrote header: {} columns", schema.len());

        let mut rows = 0u64;
        for record in prefix {
            self.write_record(out, &record, &schema).await?;
            rows += 1;
            self.tracker.update(rows);
        }

        while let Some(record) = rx.recv().await {
            self.write_record(out, &record, &schema).await?;
            rows += 1;
            self.tracker.update(rows);
        }

        Ok(WriteSummary {
            rows_written: rows,
            schema,
        })
    }

    async fn write_record<W>(
        &self,
        out: &mut BufWriter<W>,
        record: &Record,
        schema: &Schema,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let cells = self.projector.project(record, schema);
        self.write_line(out, &cells).await
    }

    async fn write_line<W>(&self, out: &mut BufWriter<W>, cells: &[String]) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut line = cells.join(&self.delimiter);
        line.push('\n');
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| ExportError::SinkFailed(format!("Failed to write row: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamtabError;
    use crate::model::Value;
    use chrono::{TimeZone, Utc};
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};

    fn record(id: i64, fields: &[(&str, Value)]) -> Record {
        fields.iter().fold(
            Record::new(Utc.timestamp_opt(id, 0).unwrap()),
            |r, (name, value)| r.with_field(*name, value.clone()),
        )
    }

    fn config(prefix: usize) -> ExportConfig {
        ExportConfig {
            schema_prefix: prefix,
            ..ExportConfig::default()
        }
    }

    async fn drain_all(config: &ExportConfig, records: Vec<Record>) -> (String, WriteSummary) {
        let (tx, rx) = mpsc::channel(10);
        let producer = tokio::spawn(async move {
            for record in records {
                tx.send(record).await.unwrap();
            }
        });

        let mut buf: Vec<u8> = Vec::new();
        let summary = StreamingWriter::new(config)
            .drain(rx, &mut buf)
            .await
            .unwrap();
        producer.await.unwrap();

        (String::from_utf8(buf).unwrap(), summary)
    }

    /// Sink that records shutdown and can refuse writes
    struct ProbeSink {
        shut_down: Arc<AtomicBool>,
        fail_writes: bool,
    }

    impl AsyncWrite for ProbeSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.fail_writes {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed pipe")))
            } else {
                Poll::Ready(Ok(buf.len()))
            }
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.shut_down.store(true, Ordering::SeqCst);
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_header_and_rows() {
        let records = vec![
            record(1, &[("a", Value::Int(1)), ("b", Value::from("x"))]),
            record(2, &[("a", Value::Int(2)), ("c", Value::from("y"))]),
            record(3, &[("a", Value::Int(3))]),
        ];

        let (out, summary) = drain_all(&config(2), records).await;
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(summary.rows_written, 3);
        assert_eq!(summary.schema.columns(), ["a", "b", "c"]);
        assert_eq!(lines[0], "#time;unixtime;;a;b;c");
        assert_eq!(lines[1], "1970-01-01T00:00:01.000000000Z;1;;1;x;");
        assert_eq!(lines[2], "1970-01-01T00:00:02.000000000Z;2;;2;;y");
        assert_eq!(lines[3], "1970-01-01T00:00:03.000000000Z;3;;3;;");
        assert!(out.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_fields_after_prefix_are_dropped() {
        let records = vec![
            record(1, &[("a", Value::Int(1))]),
            record(2, &[("a", Value::Int(2)), ("late", Value::Int(99))]),
        ];

        let (out, summary) = drain_all(&config(1), records).await;
        assert_eq!(summary.schema.columns(), ["a"]);
        assert!(!out.contains("late"));
        assert!(!out.contains("99"));
        assert_eq!(out.lines().nth(2).unwrap(), "1970-01-01T00:00:02.000000000Z;2;;2");
    }

    #[tokio::test]
    async fn test_order_preserved_across_prefix_boundary() {
        let records: Vec<Record> = (0..1200).map(|i| record(i, &[("n", Value::Int(i))])).collect();

        let (out, summary) = drain_all(&ExportConfig::default(), records).await;
        assert_eq!(summary.rows_written, 1200);

        let ids: Vec<i64> = out
            .lines()
            .skip(1)
            .map(|line| line.split(';').nth(3).unwrap().parse().unwrap())
            .collect();
        assert_eq!(ids, (0..1200).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_delimiter_safety() {
        let records = vec![
            record(1, &[("a", Value::from("semi;colon")), ("b", Value::from("multi\nline"))]),
            record(2, &[("a", Value::from([("k;1", Value::from("v\n;"))]))]),
            record(3, &[("b", Value::List(vec![Value::from(";"), Value::from("\n")]))]),
        ];

        let (out, summary) = drain_all(&ExportConfig::default(), records).await;
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 4);
        for line in &lines[1..] {
            assert_eq!(line.matches(';').count(), 2 + summary.schema.len(), "line: {line}");
        }
    }

    #[tokio::test]
    async fn test_custom_delimiter() {
        let config = ExportConfig {
            delimiter: "|".to_string(),
            ..ExportConfig::default()
        };
        let records = vec![record(1, &[("a", Value::from("x|y;z"))])];

        let (out, _) = drain_all(&config, records).await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "#time|unixtime||a");
        assert_eq!(lines[1], "1970-01-01T00:00:01.000000000Z|1||x\u{FFFD}y;z");
    }

    #[tokio::test]
    async fn test_row_shape_holds_for_every_accepted_delimiter() {
        use crate::model::Opaque;

        let records = vec![
            record(
                1_709_288_100,
                &[
                    ("a", Value::from("x:")),
                    ("b", Value::from(":y")),
                    ("c", Value::Int(-5)),
                ],
            ),
            record(
                -1,
                &[
                    ("a", Value::Other(Opaque::new("float", "-1.5e+3"))),
                    ("b", Value::from([("k-1", Value::from("v|w!"))])),
                    ("c", Value::List(vec![Value::Int(1), Value::from("\t")])),
                ],
            ),
        ];

        for delimiter in [";", "|", "\t", "!"] {
            let config = ExportConfig {
                delimiter: delimiter.to_string(),
                ..ExportConfig::default()
            };
            config.validate().unwrap();

            let (out, summary) = drain_all(&config, records.clone()).await;
            for line in out.lines() {
                assert_eq!(
                    line.matches(delimiter).count(),
                    2 + summary.schema.len(),
                    "delimiter {delimiter:?}, line: {line}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_empty_stream_writes_header_only() {
        let (out, summary) = drain_all(&ExportConfig::default(), Vec::new()).await;
        assert_eq!(out, "#time;unixtime;\n");
        assert_eq!(summary.rows_written, 0);
    }

    #[tokio::test]
    async fn test_sink_closed_on_success() {
        let shut_down = Arc::new(AtomicBool::new(false));
        let sink = ProbeSink {
            shut_down: Arc::clone(&shut_down),
            fail_writes: false,
        };

        let (tx, rx) = mpsc::channel(10);
        tx.send(record(1, &[("a", Value::Int(1))])).await.unwrap();
        drop(tx);

        StreamingWriter::new(&ExportConfig::default())
            .drain(rx, sink)
            .await
            .unwrap();
        assert!(shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_sink_closed_on_write_failure() {
        let shut_down = Arc::new(AtomicBool::new(false));
        let sink = ProbeSink {
            shut_down: Arc::clone(&shut_down),
            fail_writes: true,
        };

        // Enough rows to overflow the buffer and hit the failing sink
        let (tx, rx) = mpsc::channel(10);
        let producer = tokio::spawn(async move {
            let big = "x".repeat(64 * 1024);
            for i in 0..64 {
                if tx.send(record(i, &[("a", Value::from(big.as_str()))])).await.is_err() {
                    return i;
                }
            }
            64
        });

        let result = StreamingWriter::new(&ExportConfig::default())
            .drain(rx, sink)
            .await;

        assert!(matches!(
            result,
            Err(StreamtabError::Export(ExportError::SinkFailed(_)))
        ));
        assert!(shut_down.load(Ordering::SeqCst));

        // The producer sees the closed channel instead of blocking forever
        assert!(producer.await.unwrap() <= 64);
    }
}
