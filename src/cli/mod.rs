//! Command-line interface for streamtab
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and merging with arguments
//! - The `config` subcommand

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{Config, LogLevel};
use crate::error::{ConfigError, Result};

/// Flatten heterogeneous records into one delimited text table
#[derive(Parser, Debug)]
#[command(
    name = "streamtab",
    version,
    about = "Export heterogeneous records as a flat delimited table",
    long_about = "Reads records page by page from a JSON Lines file, infers the column set
from the leading records, and streams one delimited row per record."
)]
pub struct CliArgs {
    /// Input file with one JSON record per line
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Column delimiter
    #[arg(short = 'd', long, value_name = "DELIM")]
    pub delimiter: Option<String>,

    /// Maximum number of records to export
    #[arg(short = 'l', long, value_name = "N")]
    pub limit: Option<usize>,

    /// Records requested per page
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Leading records scanned to infer the columns
    #[arg(long, value_name = "N")]
    pub schema_prefix: Option<usize>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub progress: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for streamtab
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show configuration
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        show: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from the process arguments
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with arguments
    ///
    /// Arguments take precedence over the file, the file over defaults. The
    /// merged result is validated once.
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI arguments to configuration
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_export_args(config, args);
        Self::apply_logging_args(config, args);

        if args.progress {
            config.progress.enabled = true;
        }
    }

    /// Apply export-related CLI arguments to configuration
    fn apply_export_args(config: &mut Config, args: &CliArgs) {
        if let Some(delimiter) = &args.delimiter {
            config.export.delimiter = delimiter.clone();
        }
        if let Some(limit) = args.limit {
            config.export.record_limit = limit;
        }
        if let Some(page_size) = args.page_size {
            config.export.page_size = page_size;
        }
        if let Some(prefix) = args.schema_prefix {
            config.export.schema_prefix = prefix;
        }
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else {
            config.logging.level
        };
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Explicit configuration file path, if one was given
    pub fn config_path(&self) -> Option<&Path> {
        self.args.config_file.as_deref()
    }

    /// Input path of the export
    ///
    /// # Returns
    /// * `Result<&Path>` - Input path, or an error when none was given
    pub fn input(&self) -> Result<&Path> {
        self.args.input.as_deref().ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "input".to_string(),
                value: "<missing>".to_string(),
            }
            .into()
        })
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if subcommand was handled, false to continue
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Config { show }) => {
                if *show {
                    self.show_config()?;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        let path = self
            .config_path()
            .map(Path::to_path_buf)
            .unwrap_or_else(Config::default_path);

        println!("# Configuration file: {}", path.display());
        println!("{}", self.config.to_toml_string()?);
        Ok(())
    }
}
