//! Export coordinator for orchestrating export operations
//!
//! The coordinator probes the source, spawns the pagination pump as the
//! producer task, and drives the streaming writer as the consumer on the
//! calling task. The two are joined by one bounded channel and share nothing
//! else.

use std::time::Instant;

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::source::RecordSource;

use super::progress::ProgressTracker;
use super::pump::PaginationPump;
use super::writer::StreamingWriter;

/// Capacity of the record channel between producer and consumer
pub const CHANNEL_CAPACITY: usize = 10;

/// Result of an export operation
#[derive(Debug)]
pub struct ExportResult {
    /// Number of data rows written
    pub records_exported: u64,
    /// Schema columns written after the preamble
    pub columns: Vec<String>,
    /// Number of records the export aimed for
    pub target: usize,
    /// Time taken for export
    pub elapsed_ms: u64,
    /// Whether the export was cancelled
    pub cancelled: bool,
    /// Source failure that truncated the export
    pub source_error: Option<String>,
}

impl ExportResult {
    /// Whether every targeted record was written
    ///
    /// False after cancellation, a source failure, or a dataset that shrank
    /// below the probed total while paging.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.source_error.is_none() && !self.is_short()
    }

    /// Whether fewer records than the target were written
    pub fn is_short(&self) -> bool {
        (self.records_exported as usize) < self.target
    }
}

/// Coordinator for export operations
pub struct ExportCoordinator {
    /// Producer for records
    pump: PaginationPump,
    /// Export settings for the writer
    config: ExportConfig,
    /// Whether to draw a progress bar
    show_progress: bool,
    /// Cancellation token for aborting export
    cancel_token: CancellationToken,
}

impl ExportCoordinator {
    /// Create a new export coordinator
    pub fn new(source: Box<dyn RecordSource>, config: &ExportConfig) -> Self {
        let cancel_token = CancellationToken::new();
        Self {
            pump: PaginationPump::new(source, config).with_cancellation(cancel_token.clone()),
            config: config.clone(),
            show_progress: false,
            cancel_token,
        }
    }

    /// Set cancellation token for this export operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.pump = self.pump.with_cancellation(token.clone());
        self.cancel_token = token;
        self
    }

    /// Draw a progress bar on stderr while exporting
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Execute the export operation
    ///
    /// 1. Probe the source for its record total
    /// 2. Spawn the pump feeding the bounded channel
    /// 3. Drain the channel into `sink`
    /// 4. Join the pump and report how the export ended
    ///
    /// A failed probe is returned as an error before anything is written. A
    /// source failure after that truncates the table and is reported in
    /// [`ExportResult::source_error`].
    pub async fn execute<W>(mut self, sink: W) -> Result<ExportResult>
    where
        W: AsyncWrite + Unpin,
    {
        let start_time = Instant::now();
        info!("Starting export operation");

        let target = self.pump.start().await?;

        let tracker = ProgressTracker::new(target as u64, self.show_progress);
        let writer = StreamingWriter::new(&self.config).with_progress(tracker);

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let producer = tokio::spawn(self.pump.run(tx));

        let written = writer.drain(rx, sink).await;

        let outcome = producer
            .await
            .map_err(|e| ExportError::TaskFailed(e.to_string()))?;
        let summary = written?;

        debug!("Pump ended in state {:?}", outcome.state);

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        let cancelled = outcome.cancelled || self.cancel_token.is_cancelled();
        let source_error = outcome.error.map(|e| e.to_string());

        if let Some(ref e) = source_error {
            warn!(
                "Export truncated after {} of {} records: {}",
                summary.rows_written, target, e
            );
        } else if (summary.rows_written as usize) < target && !cancelled {
            warn!(
                "Export ended after {} of {} records: source has fewer records than declared",
                summary.rows_written, target
            );
        } else {
            info!(
                "Export completed: {} records, {} columns, {} ms",
                summary.rows_written,
                summary.schema.len(),
                elapsed_ms
            );
        }

        Ok(ExportResult {
            records_exported: summary.rows_written,
            columns: summary.schema.columns().to_vec(),
            target,
            elapsed_ms,
            cancelled,
            source_error,
        })
    }
}
