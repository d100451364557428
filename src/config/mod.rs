//! Configuration management for streamtab
//!
//! Configuration comes from, in order of precedence:
//! 1. Command-line arguments
//! 2. Configuration file (TOML format)
//! 3. Default values
//!
//! The resolved [`Config`] is passed explicitly into the export pipeline;
//! nothing reads configuration from global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::formatter::{DELIMITER_SENTINEL, NEWLINE_SENTINEL};

/// Characters that appear unescaped in cells or in the header: object and
/// list punctuation, timestamp and number punctuation, the quotes around
/// opaque values and the header marker. ASCII letters and digits are
/// rejected separately.
const RESERVED_DELIMITER_CHARS: &[char] = &[
    '/', ',', '=', '{', '}', ' ', '\n', '\r', ':', '-', '.', '+', '"', '#',
];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Export pipeline configuration
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Progress display configuration
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// Export pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Column separator
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Maximum number of records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum number of records to export
    #[serde(default = "default_record_limit")]
    pub record_limit: usize,

    /// Number of leading records scanned to infer the column set
    #[serde(default = "default_schema_prefix")]
    pub schema_prefix: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default)]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Progress bar configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Show a progress bar on stderr
    #[serde(default)]
    pub enabled: bool,
}

// Default value functions
fn default_delimiter() -> String {
    crate::formatter::DEFAULT_DELIMITER.to_string()
}

fn default_page_size() -> usize {
    500
}

fn default_record_limit() -> usize {
    1_000_000
}

fn default_schema_prefix() -> usize {
    500
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            page_size: default_page_size(),
            record_limit: default_record_limit(),
            schema_prefix: default_schema_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from an explicit path or the default location
    ///
    /// An explicit path must exist. The default path is optional; when it is
    /// absent the built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".streamtab")
            .join("config.toml")
    }

    /// Serialize configuration to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        self.export.validate()
    }
}

impl ExportConfig {
    /// Validate export settings
    pub fn validate(&self) -> Result<()> {
        if !is_safe_delimiter(&self.delimiter) {
            return Err(invalid("export.delimiter", &self.delimiter));
        }

        if self.page_size == 0 {
            return Err(invalid("export.page_size", self.page_size));
        }

        if self.schema_prefix == 0 {
            return Err(invalid("export.schema_prefix", self.schema_prefix));
        }

        Ok(())
    }
}

/// A delimiter must be one character that no formatted cell can contain
/// unless it came from sanitized text.
///
/// Multi-character delimiters are refused: two adjacent cells could end and
/// start with halves of one and form an extra match at the boundary.
fn is_safe_delimiter(delimiter: &str) -> bool {
    let mut chars = delimiter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            !c.is_ascii_alphanumeric()
                && !RESERVED_DELIMITER_CHARS.contains(&c)
                && c != DELIMITER_SENTINEL
                && c != NEWLINE_SENTINEL
        }
        _ => false,
    }
}

fn invalid(field: &str, value: impl ToString) -> crate::error::StreamtabError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
