//! Error handling for streamtab.
//!
//! Errors are grouped by the layer that raises them:
//! - [`SourceError`]: the record source failed to deliver a page
//! - [`ConfigError`]: configuration could not be loaded or is invalid
//! - [`ExportError`]: the output sink or the pipeline tasks failed
//!
//! Formatting and row projection never fail, so there is no error kind
//! for them.
//!
//! # Example
//!
//! ```rust,no_run
//! use streamtab::error::{ConfigError, Result};
//!
//! fn check_page_size(size: usize) -> Result<()> {
//!     if size == 0 {
//!         return Err(ConfigError::InvalidValue {
//!             field: "export.page_size".to_string(),
//!             value: size.to_string(),
//!         }
//!         .into());
//!     }
//!     Ok(())
//! }
//! ```

pub mod kinds;

// Re-export commonly used types
pub use kinds::{ConfigError, ExportError, Result, SourceError, StreamtabError};
