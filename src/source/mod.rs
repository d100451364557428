//! Record sources
//!
//! A [`RecordSource`] hands out records page by page, together with the
//! total number of records the dataset declares. The export pipeline only
//! ever talks to this trait; authentication, name resolution and the actual
//! transport live behind it.
//!
//! Two implementations ship with the crate:
//! - [`MemorySource`]: records held in memory, with optional failure and
//!   latency injection
//! - [`JsonLinesSource`]: a JSON Lines file read forward, one record per line

use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::Record;

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonLinesSource;
pub use memory::MemorySource;

/// One page of records
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records starting at the requested offset, at most `limit` of them
    pub records: Vec<Record>,
    /// Total number of records the dataset currently declares
    pub total: usize,
}

/// Trait for paginated record retrieval
#[async_trait]
pub trait RecordSource: Send {
    /// Fetch up to `limit` records starting at `offset`
    ///
    /// A page is delivered whole or not at all: on error no record of the
    /// page is returned.
    async fn fetch_page(&mut self, offset: usize, limit: usize) -> Result<Page, SourceError>;

    /// Short human-readable description, for logging
    fn describe(&self) -> String {
        "record source".to_string()
    }
}
