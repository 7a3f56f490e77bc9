//! flatexport - collection export tool
//!
//! Exports a schema-less MongoDB collection to a flat CSV file or a JSON
//! array, and narrows existing CSV exports down to selected columns.
//!
//! # Usage
//!
//! ```bash
//! # Whole collection to orders.csv
//! flatexport export orders --uri mongodb://localhost:27017/shop
//!
//! # One month, newest first, as JSON on stdout
//! flatexport export orders --start 2024-01-01 --end 2024-01-31 --desc -f json --stdout
//!
//! # Keep two columns of an earlier export
//! flatexport filter orders.csv slim/orders.csv --columns id,amount
//! ```

use std::time::Duration;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use flatexport::cli::{CliInterface, Commands, ExportArgs, FilterArgs};
use flatexport::connection::ConnectionManager;
use flatexport::error::Result;
use flatexport::export::run_export;
use flatexport::filter::filter_csv;
use flatexport::utils::time::format_duration;

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
/// 3. Dispatch the subcommand
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    match &cli.args().command {
        Commands::Export(args) => run_export_command(&cli, args).await,
        Commands::Filter(args) => run_filter_command(&cli, args).await,
        _ => Ok(()),
    }
}

/// Connect, export, disconnect
async fn run_export_command(cli: &CliInterface, args: &ExportArgs) -> Result<()> {
    // argument errors surface before any connection attempt
    let options = cli.export_options(args)?;
    options.resolve_bounds()?;

    let mut manager = ConnectionManager::new(
        cli.connection_uri().to_string(),
        cli.config().connection.clone(),
    );
    manager.connect().await?;

    let database = cli.database(args);
    debug!("Using database '{}'", database);

    let outcome = match manager.page_source(&database) {
        Ok(source) => run_export(&source, &options).await,
        Err(e) => Err(e),
    };
    manager.disconnect().await?;
    let summary = outcome?;

    if !cli.args().quiet {
        eprintln!(
            "Exported {} rows ({} columns, {} pages) to {} in {}",
            summary.rows,
            summary.columns.len(),
            summary.pages,
            summary.output,
            format_duration(Duration::from_millis(summary.elapsed_ms))
        );
    }
    Ok(())
}

async fn run_filter_command(cli: &CliInterface, args: &FilterArgs) -> Result<()> {
    let options = cli.filter_options(args)?;
    let summary = filter_csv(&options).await?;

    if !cli.args().quiet {
        eprintln!(
            "Wrote {} rows with columns {} to {}",
            summary.rows,
            summary.columns.join(", "),
            options.output.display()
        );
    }
    Ok(())
}

/// Initialize logging system based on verbosity level
///
/// Logs go to stderr; stdout may carry the export itself.
fn initialize_logging(cli: &CliInterface) {
    let filter = EnvFilter::new(cli.config().logging.level.log_filter());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
