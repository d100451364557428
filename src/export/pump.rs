//! Pagination pump: the producer side of the export pipeline
//!
//! The pump learns the declared total with a zero-length probe, caps it at
//! the configured record limit, then fetches pages at increasing offsets and
//! pushes every record into the bounded channel. Sending blocks while the
//! channel is full, which keeps the pump at most one channel's worth of
//! records (plus the page in hand) ahead of the writer.
//!
//! Dropping the sender is the only end-of-stream signal. A failed page ends
//! the stream early without pushing any of that page's records.
//!
//! Offsets are computed from the records delivered so far. If the remote
//! dataset gains or loses records between the probe and later pages, records
//! may be skipped or repeated; this is not detected.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ExportConfig;
use crate::error::SourceError;
use crate::model::Record;
use crate::source::RecordSource;

/// Page length of the provisional fetch that learns the total
const PROBE_LIMIT: usize = 0;

/// Lifecycle of a pump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// Total not yet probed
    NotStarted,
    /// Waiting on a page fetch
    Fetching,
    /// Pushing a fetched page into the channel
    Delivering,
    /// Target reached, source exhausted, cancelled, or consumer gone
    Done,
    /// A fetch failed
    Failed,
}

/// How a pump run ended
#[derive(Debug)]
pub struct PumpOutcome {
    /// Final state, `Done` or `Failed`
    pub state: PumpState,
    /// Records pushed into the channel
    pub delivered: usize,
    /// Number of records the pump aimed for
    pub target: usize,
    /// The fetch error that ended the run, if any
    pub error: Option<SourceError>,
    /// Whether the run stopped on cancellation
    pub cancelled: bool,
}

/// Producer that streams paginated records into a channel
pub struct PaginationPump {
    source: Box<dyn RecordSource>,
    page_size: usize,
    record_limit: usize,
    target: usize,
    delivered: usize,
    state: PumpState,
    cancel_token: CancellationToken,
}

impl PaginationPump {
    /// Create a pump over `source` using the page size and record limit of `config`
    pub fn new(source: Box<dyn RecordSource>, config: &ExportConfig) -> Self {
        Self {
            source,
            page_size: config.page_size.max(1),
            record_limit: config.record_limit,
            target: 0,
            delivered: 0,
            state: PumpState::NotStarted,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Stop fetching further pages once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Number of records the pump will try to deliver
    pub fn target(&self) -> usize {
        self.target
    }

    /// Probe the source for its total and fix the target count
    ///
    /// # Returns
    /// * `Result<usize, SourceError>` - `min(total, record_limit)`
    pub async fn start(&mut self) -> Result<usize, SourceError> {
        self.state = PumpState::Fetching;
        let probe = match self.source.fetch_page(0, PROBE_LIMIT).await {
            Ok(page) => page,
            Err(e) => {
                self.state = PumpState::Failed;
                return Err(e);
            }
        };

        self.target = probe.total.min(self.record_limit);
        info!(
            "{} declares {} records, exporting {}",
            self.source.describe(),
            probe.total,
            self.target
        );
        Ok(self.target)
    }

    /// Fetch and deliver records until the target is reached
    ///
    /// Consumes the pump; `tx` is dropped on return, closing the channel.
    pub async fn run(mut self, tx: mpsc::Sender<Record>) -> PumpOutcome {
        if self.state == PumpState::NotStarted {
            if let Err(e) = self.start().await {
                error!("Failed to probe record total: {}", e);
                return self.finish(Some(e), false);
            }
        }

        while self.delivered < self.target {
            if self.cancel_token.is_cancelled() {
                info!("Export cancelled after {} records", self.delivered);
                return self.finish(None, true);
            }

            let offset = self.delivered;
            let limit = self.page_size.min(self.target - self.delivered);

            self.state = PumpState::Fetching;
            debug!("Fetching {} records at offset {}", limit, offset);

            let page = match self.source.fetch_page(offset, limit).await {
                Ok(page) => page,
                Err(e) => {
                    error!("Error fetching records: {}", e);
                    return self.finish(Some(e), false);
                }
            };

            if page.records.is_empty() {
                warn!(
                    "Source returned no records at offset {} of {}; stopping early",
                    offset, self.target
                );
                break;
            }

            self.state = PumpState::Delivering;
            for record in page.records.into_iter().take(limit) {
                if tx.send(record).await.is_err() {
                    debug!("Record channel closed by consumer after {} records", self.delivered);
                    return self.finish(None, false);
                }
                self.delivered += 1;
            }
        }

        debug!("Pump finished after {} records", self.delivered);
        self.finish(None, false)
    }

    fn finish(&mut self, error: Option<SourceError>, cancelled: bool) -> PumpOutcome {
        self.state = if error.is_some() {
            PumpState::Failed
        } else {
            PumpState::Done
        };

        PumpOutcome {
            state: self.state,
            delivered: self.delivered,
            target: self.target,
            error,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use crate::source::MemorySource;
    use chrono::{TimeZone, Utc};
    use std::task::Poll;
    use std::time::Duration;
    use tokio_test::assert_pending;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::new(Utc.timestamp_opt(i as i64, 0).unwrap())
                    .with_field("n", Value::Int(i as i64))
            })
            .collect()
    }

    fn config(page_size: usize, record_limit: usize) -> ExportConfig {
        ExportConfig {
            page_size,
            record_limit,
            ..ExportConfig::default()
        }
    }

    async fn collect(mut rx: mpsc::Receiver<Record>) -> Vec<i64> {
        let mut ids = Vec::new();
        while let Some(record) = rx.recv().await {
            ids.push(record.created_on.timestamp());
        }
        ids
    }

    #[tokio::test]
    async fn test_pages_and_order() {
        let source = MemorySource::new(records(23));
        let log = source.request_log();
        let pump = PaginationPump::new(Box::new(source), &config(10, 1_000_000));

        let (tx, rx) = mpsc::channel(10);
        let producer = tokio::spawn(pump.run(tx));
        let ids = collect(rx).await;
        let outcome = producer.await.unwrap();

        assert_eq!(ids, (0..23).collect::<Vec<_>>());
        assert_eq!(outcome.state, PumpState::Done);
        assert_eq!(outcome.delivered, 23);
        assert!(outcome.error.is_none());
        assert_eq!(
            *log.lock().unwrap(),
            vec![(0, 0), (0, 10), (10, 10), (20, 3)]
        );
    }

    #[tokio::test]
    async fn test_record_limit_caps_target() {
        let source = MemorySource::new(records(50));
        let log = source.request_log();
        let mut pump = PaginationPump::new(Box::new(source), &config(20, 25));

        assert_eq!(pump.start().await.unwrap(), 25);
        assert_eq!(pump.target(), 25);

        let (tx, rx) = mpsc::channel(10);
        let producer = tokio::spawn(pump.run(tx));
        assert_eq!(collect(rx).await.len(), 25);
        producer.await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![(0, 0), (0, 20), (20, 5)]);
    }

    #[tokio::test]
    async fn test_failed_page_closes_channel_without_partial_page() {
        // Call 0 is the probe; call 2 is the second page
        let source = MemorySource::new(records(30)).fail_on_call(2);
        let pump = PaginationPump::new(Box::new(source), &config(10, 1_000_000));

        let (tx, rx) = mpsc::channel(10);
        let producer = tokio::spawn(pump.run(tx));
        let ids = collect(rx).await;
        let outcome = producer.await.unwrap();

        assert_eq!(ids, (0..10).collect::<Vec<_>>());
        assert_eq!(outcome.state, PumpState::Failed);
        assert_eq!(outcome.delivered, 10);
        assert!(matches!(
            outcome.error,
            Some(SourceError::FetchFailed { offset: 10, limit: 10, .. })
        ));
    }

    #[tokio::test]
    async fn test_probe_failure() {
        let source = MemorySource::new(records(5)).fail_on_call(0);
        let mut pump = PaginationPump::new(Box::new(source), &ExportConfig::default());

        assert!(pump.start().await.is_err());
        assert_eq!(pump.state(), PumpState::Failed);
    }

    #[tokio::test]
    async fn test_run_without_start_reports_probe_failure() {
        let source = MemorySource::new(records(5)).fail_on_call(0);
        let pump = PaginationPump::new(Box::new(source), &ExportConfig::default());

        let (tx, rx) = mpsc::channel(10);
        let outcome = pump.run(tx).await;
        assert!(collect(rx).await.is_empty());
        assert_eq!(outcome.state, PumpState::Failed);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_shrunken_dataset_stops() {
        let source = MemorySource::new(records(3)).with_declared_total(8);
        let pump = PaginationPump::new(Box::new(source), &config(5, 1_000_000));

        let (tx, rx) = mpsc::channel(10);
        let producer = tokio::spawn(pump.run(tx));
        assert_eq!(collect(rx).await.len(), 3);

        let outcome = producer.await.unwrap();
        assert_eq!(outcome.state, PumpState::Done);
        assert_eq!(outcome.target, 8);
        assert_eq!(outcome.delivered, 3);
    }

    #[tokio::test]
    async fn test_cancellation_before_next_page() {
        let token = CancellationToken::new();
        let source = MemorySource::new(records(100));
        let pump = PaginationPump::new(Box::new(source), &config(10, 1_000_000))
            .with_cancellation(token.clone());

        let (tx, mut rx) = mpsc::channel(10);
        let producer = tokio::spawn(pump.run(tx));

        // Take the first page, then cancel while the pump waits on the channel
        let mut received = 0;
        while received < 10 {
            rx.recv().await.unwrap();
            received += 1;
        }
        token.cancel();

        while rx.recv().await.is_some() {
            received += 1;
        }
        let outcome = producer.await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.state, PumpState::Done);
        assert!(received < 100);
        assert_eq!(received, outcome.delivered);
    }

    #[tokio::test]
    async fn test_zero_limit_delivers_nothing() {
        let source = MemorySource::new(records(5));
        let pump = PaginationPump::new(Box::new(source), &config(10, 0));

        let (tx, rx) = mpsc::channel(10);
        let outcome = pump.run(tx).await;
        assert!(collect(rx).await.is_empty());
        assert_eq!(outcome.state, PumpState::Done);
    }

    #[tokio::test]
    async fn test_backpressure_bounds_producer_lead() {
        let source = MemorySource::new(records(50));
        let mut pump = PaginationPump::new(Box::new(source), &config(50, 1_000_000));
        pump.start().await.unwrap();

        let (tx, mut rx) = mpsc::channel(10);
        let mut producer = tokio_test::task::spawn(pump.run(tx));

        // The whole page is fetched, but only 10 records fit in the channel
        assert_pending!(producer.poll());
        assert_eq!(rx.len(), 10);

        // Without a consumer the producer stays parked
        assert_pending!(producer.poll());
        assert_eq!(rx.len(), 10);

        // Consuming one record lets exactly one more in
        rx.recv().await.unwrap();
        assert!(producer.is_woken());
        assert_pending!(producer.poll());
        assert_eq!(rx.len(), 10);

        // Drain the rest; the producer completes once everything is queued
        let mut consumed = 1;
        let outcome = loop {
            while rx.try_recv().is_ok() {
                consumed += 1;
            }
            if let Poll::Ready(outcome) = producer.poll() {
                break outcome;
            }
        };
        while rx.try_recv().is_ok() {
            consumed += 1;
        }

        assert_eq!(outcome.delivered, 50);
        assert_eq!(consumed, 50);
    }

    #[tokio::test]
    async fn test_slow_source_still_ordered() {
        let source = MemorySource::new(records(12)).with_delay(Duration::from_millis(5));
        let pump = PaginationPump::new(Box::new(source), &config(5, 1_000_000));

        let (tx, rx) = mpsc::channel(10);
        let producer = tokio::spawn(pump.run(tx));
        assert_eq!(collect(rx).await, (0..12).collect::<Vec<_>>());
        assert_eq!(producer.await.unwrap().delivered, 12);
    }
}
