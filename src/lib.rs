//! streamtab library
//!
//! Exports records fetched page by page from a remote source into one flat,
//! delimited text table, even though every record carries its own mix of
//! named fields with nested, polymorphic values.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: Streaming export pipeline (pump, schema inference, writer)
//! - `formatter`: Value-to-cell formatting
//! - `model`: Record, field and value types
//! - `source`: Record sources
//!
//! # Example
//!
//! ```no_run
//! use streamtab::{Config, ExportCoordinator, source::JsonLinesSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let source = JsonLinesSource::open("items.jsonl").await?;
//!
//!     let result = ExportCoordinator::new(Box::new(source), &config.export)
//!         .execute(tokio::io::stdout())
//!         .await?;
//!
//!     eprintln!("Exported {} records", result.records_exported);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod formatter;
pub mod model;
pub mod source;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, StreamtabError};
pub use export::{ExportCoordinator, ExportResult};
pub use formatter::ValueFormatter;
pub use model::{Field, Record, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
