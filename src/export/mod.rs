//! Streaming export of paginated records into a delimited text table
//!
//! The export pipeline is a bounded producer/consumer pair:
//!
//! 1. **PaginationPump**: fetches pages from a [`RecordSource`] and pushes
//!    records one by one into a channel of capacity [`CHANNEL_CAPACITY`]
//! 2. **StreamingWriter**: consumes the channel, infers the column set from
//!    the first records with a **SchemaCollector**, then writes the header and
//!    one **RowProjector** line per record
//!
//! These components are orchestrated by the **ExportCoordinator**.
//!
//! # Example
//!
//! ```no_run
//! use streamtab::config::ExportConfig;
//! use streamtab::export::ExportCoordinator;
//! use streamtab::source::JsonLinesSource;
//!
//! # async fn run() -> streamtab::Result<()> {
//! let source = JsonLinesSource::open("items.jsonl").await?;
//! let coordinator = ExportCoordinator::new(Box::new(source), &ExportConfig::default());
//! let result = coordinator.execute(tokio::io::stdout()).await?;
//! assert!(result.is_complete());
//! # Ok(())
//! # }
//! ```
//!
//! [`RecordSource`]: crate::source::RecordSource

pub mod coordinator;
pub mod progress;
pub mod projector;
pub mod pump;
pub mod schema;
pub mod writer;

pub use coordinator::{CHANNEL_CAPACITY, ExportCoordinator, ExportResult};
pub use progress::ProgressTracker;
pub use projector::{PREAMBLE_COLUMNS, RowProjector};
pub use pump::{PaginationPump, PumpOutcome, PumpState};
pub use schema::{Schema, SchemaCollector};
pub use writer::{StreamingWriter, WriteSummary};
