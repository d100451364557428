use std::{fmt, io};

/// Crate-wide `Result` type using [`StreamtabError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, StreamtabError>;

/// Top-level error type for streamtab operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum StreamtabError {
    /// Record source errors.
    Source(SourceError),

    /// Configuration errors.
    Config(ConfigError),

    /// Export pipeline errors.
    Export(ExportError),

    /// I/O errors.
    Io(io::Error),

    /// JSON decoding errors.
    Json(serde_json::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Record source errors.
#[derive(Debug, Clone)]
pub enum SourceError {
    /// Fetching a page failed (network, authorization, rate limit, ...).
    FetchFailed {
        offset: usize,
        limit: usize,
        reason: String,
    },

    /// A record could not be decoded from its wire form.
    InvalidRecord { line: usize, reason: String },

    /// The source only reads forward and the requested offset is behind it.
    NotSeekable { requested: usize, position: usize },
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Export pipeline errors.
#[derive(Debug)]
pub enum ExportError {
    /// Writing to or closing the output sink failed.
    SinkFailed(String),

    /// A pipeline task panicked or was aborted.
    TaskFailed(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for StreamtabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamtabError::Source(e) => write!(f, "Source error: {e}"),
            StreamtabError::Config(e) => write!(f, "Configuration error: {e}"),
            StreamtabError::Export(e) => write!(f, "Export error: {e}"),
            StreamtabError::Io(e) => write!(f, "I/O error: {e}"),
            StreamtabError::Json(e) => write!(f, "JSON error: {e}"),
            StreamtabError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::FetchFailed {
                offset,
                limit,
                reason,
            } => write!(
                f,
                "Failed to fetch {limit} records at offset {offset}: {reason}"
            ),
            SourceError::InvalidRecord { line, reason } => {
                write!(f, "Invalid record on line {line}: {reason}")
            }
            SourceError::NotSeekable {
                requested,
                position,
            } => write!(
                f,
                "Cannot rewind to offset {requested}, source is already at {position}"
            ),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::SinkFailed(msg) => write!(f, "Output failed: {msg}"),
            ExportError::TaskFailed(msg) => write!(f, "Pipeline task failed: {msg}"),
        }
    }
}

impl std::error::Error for StreamtabError {}
impl std::error::Error for SourceError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for ExportError {}

/* ========================= Conversions to StreamtabError ========================= */

impl From<io::Error> for StreamtabError {
    fn from(err: io::Error) -> Self {
        StreamtabError::Io(err)
    }
}

impl From<serde_json::Error> for StreamtabError {
    fn from(err: serde_json::Error) -> Self {
        StreamtabError::Json(err)
    }
}

impl From<toml::de::Error> for StreamtabError {
    fn from(err: toml::de::Error) -> Self {
        StreamtabError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<SourceError> for StreamtabError {
    fn from(err: SourceError) -> Self {
        StreamtabError::Source(err)
    }
}

impl From<ConfigError> for StreamtabError {
    fn from(err: ConfigError) -> Self {
        StreamtabError::Config(err)
    }
}

impl From<ExportError> for StreamtabError {
    fn from(err: ExportError) -> Self {
        StreamtabError::Export(err)
    }
}

impl From<String> for StreamtabError {
    fn from(msg: String) -> Self {
        StreamtabError::Generic(msg)
    }
}

impl From<&str> for StreamtabError {
    fn from(msg: &str) -> Self {
        StreamtabError::Generic(msg.to_owned())
    }
}
