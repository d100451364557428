//! In-memory record source

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Page, RecordSource};
use crate::error::SourceError;
use crate::model::Record;

/// Shared log of `(offset, limit)` requests made against a [`MemorySource`]
pub type RequestLog = Arc<Mutex<Vec<(usize, usize)>>>;

/// Record source backed by a vector
///
/// Useful for tests and demos: it can fail on a chosen call, report a
/// declared total that differs from the records it holds, and sleep before
/// every fetch.
pub struct MemorySource {
    records: Vec<Record>,
    declared_total: Option<usize>,
    fail_on_call: Option<usize>,
    delay: Option<Duration>,
    calls: usize,
    requests: RequestLog,
}

impl MemorySource {
    /// Create a source serving `records`
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            declared_total: None,
            fail_on_call: None,
            delay: None,
            calls: 0,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Report `total` instead of the number of held records
    pub fn with_declared_total(mut self, total: usize) -> Self {
        self.declared_total = Some(total);
        self
    }

    /// Fail the `call`-th fetch (0-based, the total probe included)
    pub fn fail_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Sleep before serving every fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle on the request log, usable after the source is moved away
    pub fn request_log(&self) -> RequestLog {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn fetch_page(&mut self, offset: usize, limit: usize) -> Result<Page, SourceError> {
        let call = self.calls;
        self.calls += 1;

        if let Ok(mut log) = self.requests.lock() {
            log.push((offset, limit));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_on_call == Some(call) {
            return Err(SourceError::FetchFailed {
                offset,
                limit,
                reason: format!("injected failure on call {call}"),
            });
        }

        let start = offset.min(self.records.len());
        let end = offset.saturating_add(limit).min(self.records.len());
        let records = self.records[start..end].to_vec();

        debug!("Memory source served {} records at offset {}", records.len(), offset);

        Ok(Page {
            records,
            total: self.declared_total.unwrap_or(self.records.len()),
        })
    }

    fn describe(&self) -> String {
        format!("memory source ({} records)", self.records.len())
    }
}
