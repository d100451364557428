//! streamtab
//!
//! Flattens a stream of heterogeneous records into one delimited text table.
//!
//! # Usage
//!
//! ```bash
//! # Export to stdout
//! streamtab items.jsonl
//!
//! # Export the first 1000 records to a file with a custom delimiter
//! streamtab items.jsonl -o items.csv -d '|' -l 1000
//!
//! # Print the effective configuration
//! streamtab config --show
//! ```

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};

use streamtab::cli::CliInterface;
use streamtab::error::{ExportError, Result};
use streamtab::export::ExportCoordinator;
use streamtab::source::JsonLinesSource;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands or run the export
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    run_export(&cli).await
}

/// Export the input file to the configured sink
async fn run_export(cli: &CliInterface) -> Result<()> {
    let config = cli.config();
    let source = JsonLinesSource::open(cli.input()?).await?;
    let sink = open_sink(cli).await?;

    let cancel_token = CancellationToken::new();
    let ctrl_c_handle = spawn_ctrl_c_handler(cancel_token.clone());

    let result = ExportCoordinator::new(Box::new(source), &config.export)
        .with_cancellation(cancel_token)
        .with_progress(config.progress.enabled)
        .execute(sink)
        .await;

    ctrl_c_handle.abort();
    let result = result?;

    if result.cancelled {
        return Err(ExportError::TaskFailed(format!(
            "Export cancelled after {} records",
            result.records_exported
        ))
        .into());
    }

    if let Some(reason) = result.source_error {
        return Err(ExportError::TaskFailed(format!(
            "Export truncated after {} of {} records: {}",
            result.records_exported, result.target, reason
        ))
        .into());
    }

    if result.is_short() {
        return Err(ExportError::TaskFailed(format!(
            "Export ended after {} of {} records: source has fewer records than declared",
            result.records_exported, result.target
        ))
        .into());
    }

    info!(
        "Exported {} records ({} columns) in {} ms",
        result.records_exported,
        result.columns.len(),
        result.elapsed_ms
    );
    Ok(())
}

/// Open the output file, or stdout when none was given
async fn open_sink(cli: &CliInterface) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
    match &cli.args().output {
        Some(path) => {
            let file = tokio::fs::File::create(path).await.map_err(|e| {
                ExportError::SinkFailed(format!("Failed to create {}: {}", path.display(), e))
            })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Cancel the export on Ctrl+C
fn spawn_ctrl_c_handler(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => token.cancel(),
            Err(err) => eprintln!("Failed to listen for Ctrl+C: {}", err),
        }
    })
}

/// Initialize logging system based on the effective configuration
///
/// Logs go to stderr so they never mix with table output on stdout.
fn initialize_logging(cli: &CliInterface) {
    let level: Level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
