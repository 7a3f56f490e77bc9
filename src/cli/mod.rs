//! Command-line interface for flatexport
//!
//! This module handles parsing command-line arguments and merging them with
//! the configuration file. Arguments always win over the file.

pub mod completion;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{Config, LogLevel, validate_delimiter};
use crate::connection::database_from_uri;
use crate::error::{InputError, Result};
use crate::export::{ExportFormat, ExportOptions, OutputTarget, SortSpec};
use crate::fetch::RetryPolicy;
use crate::filter::FilterOptions;
use crate::sort::SortDirection;
use crate::utils::fs::{default_output_path, expand_home};

/// Export a MongoDB collection to CSV or JSON
#[derive(Parser, Debug)]
#[command(
    name = "flatexport",
    version,
    about = "Export a MongoDB collection to CSV or JSON",
    long_about = "Scans a whole collection page by page, optionally keeps a date range,
sorts by any attribute and writes a flat CSV or a JSON array."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only, no progress)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for flatexport
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a collection
    Export(ExportArgs),

    /// Keep selected columns of an existing CSV file
    Filter(FilterArgs),

    /// Show or validate configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show version information
    Version,
}

/// Output format flag
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

/// Arguments of `export`
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Collection to export
    #[arg(value_name = "COLLECTION")]
    pub collection: String,

    /// MongoDB connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[arg(long, value_name = "URI")]
    pub uri: Option<String>,

    /// Database name (defaults to the URI path, then the config file)
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Inclusive lower bound, ISO 8601 date or date-time (UTC when no zone)
    #[arg(long, value_name = "DATE")]
    pub start: Option<String>,

    /// Inclusive upper bound, ISO 8601 date or date-time (UTC when no zone)
    #[arg(long, value_name = "DATE")]
    pub end: Option<String>,

    /// Attribute the date bounds apply to
    #[arg(long, value_name = "ATTR")]
    pub date_attr: Option<String>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = FormatArg::Csv)]
    pub format: FormatArg,

    /// Output file (defaults to <collection>.<format>)
    #[arg(short = 'o', long, value_name = "FILE", conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Write to standard output instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// CSV field delimiter
    #[arg(short = 'd', long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Sort rows before writing
    #[arg(long)]
    pub sort: bool,

    /// Attribute to sort by (implies --sort)
    #[arg(long, value_name = "ATTR")]
    pub sort_attr: Option<String>,

    /// Sort in descending order (implies --sort)
    #[arg(long)]
    pub desc: bool,

    /// Columns to keep, in output order (space or comma separated)
    #[arg(long, value_name = "COLUMN", num_args = 1..)]
    pub columns: Vec<String>,

    /// Drop unknown columns with a warning instead of failing
    #[arg(long)]
    pub ignore_missing: bool,

    /// Documents scanned per page
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// Retries for transient page failures
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments of `filter`
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// CSV file to read
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// CSV file to write
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Columns to keep, in output order (space or comma separated)
    #[arg(long, value_name = "COLUMN", num_args = 1.., required = true)]
    pub columns: Vec<String>,

    /// Drop unknown columns with a warning instead of failing
    #[arg(long)]
    pub ignore_missing: bool,

    /// CSV field delimiter
    #[arg(short = 'd', long, value_name = "CHAR")]
    pub delimiter: Option<char>,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and load configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with arguments
    fn load_config(args: &CliArgs) -> Result<Config> {
        let path = args
            .config_file
            .as_ref()
            .map(|p| expand_home(&p.to_string_lossy()));
        let mut config = Config::load_from_file(path.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI arguments to configuration
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };

        if let Commands::Export(export) = &args.command {
            if let Some(uri) = &export.uri {
                config.connection.uri = uri.clone();
            }
            if let Some(timeout) = export.timeout {
                config.connection.timeout = timeout;
            }
            if let Some(attr) = &export.date_attr {
                config.export.date_attr = attr.clone();
            }
            if let Some(attr) = &export.sort_attr {
                config.export.sort_attr = attr.clone();
            }
            if let Some(page_size) = export.page_size {
                config.export.page_size = page_size;
            }
            if let Some(retries) = export.retries {
                config.export.retry_attempts = retries;
            }
            if export.no_progress {
                config.export.progress = false;
            }
        }
        if args.quiet {
            config.export.progress = false;
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Get the MongoDB connection URI
    pub fn connection_uri(&self) -> &str {
        &self.config.connection.uri
    }

    /// Get the database name to use
    ///
    /// Priority:
    /// 1. --database argument
    /// 2. Database name from connection URI
    /// 3. Configured default
    pub fn database(&self, args: &ExportArgs) -> String {
        if let Some(db) = &args.database {
            return db.clone();
        }
        if let Some(db) = database_from_uri(self.connection_uri()) {
            return db;
        }
        self.config.connection.database.clone()
    }

    /// Build export options from arguments and configuration
    pub fn export_options(&self, args: &ExportArgs) -> Result<ExportOptions> {
        let export = &self.config.export;
        let format = ExportFormat::from(args.format);

        let output = if args.stdout {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(
                args.output
                    .clone()
                    .unwrap_or_else(|| default_output_path(&args.collection, format.extension())),
            )
        };

        let sort = (args.sort || args.sort_attr.is_some() || args.desc).then(|| SortSpec {
            attribute: export.sort_attr.clone(),
            direction: if args.desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
        });

        Ok(ExportOptions {
            collection: args.collection.clone(),
            date_attr: export.date_attr.clone(),
            start: args.start.clone(),
            end: args.end.clone(),
            format,
            output,
            delimiter: self.delimiter(args.delimiter)?,
            sort,
            columns: (!args.columns.is_empty())
                .then(|| crate::project::normalize_columns(&args.columns)),
            ignore_missing: args.ignore_missing,
            page_size: export.page_size,
            retry: RetryPolicy::new(export.retry_attempts, self.config.retry_backoff()),
            progress: export.progress,
        })
    }

    /// Build filter options from arguments and configuration
    pub fn filter_options(&self, args: &FilterArgs) -> Result<FilterOptions> {
        Ok(FilterOptions {
            input: args.input.clone(),
            output: args.output.clone(),
            columns: args.columns.clone(),
            ignore_missing: args.ignore_missing,
            delimiter: self.delimiter(args.delimiter)?,
        })
    }

    fn delimiter(&self, arg: Option<char>) -> Result<char> {
        let delimiter = arg.unwrap_or(self.config.export.delimiter);
        validate_delimiter(delimiter).map_err(|_| InputError::InvalidOption {
            option: "delimiter".to_string(),
            value: delimiter.to_string(),
        })?;
        Ok(delimiter)
    }

    /// Handle subcommands that need no connection
    ///
    /// # Returns
    /// * `Result<bool>` - True if subcommand was handled, false to continue
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Commands::Version => {
                self.show_version();
                Ok(true)
            }
            Commands::Completion { shell } => {
                completion::generate_completion(shell, &mut std::io::stdout())?;
                Ok(true)
            }
            Commands::Config { show, validate } => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            Commands::Export(_) | Commands::Filter(_) => Ok(false),
        }
    }

    /// Show version information
    fn show_version(&self) {
        println!("flatexport version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Handle config subcommand
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            // load_config already validated; reaching here means it passed
            println!(
                "Configuration is valid: {}",
                self.get_config_path().display()
            );
        }

        if show || !validate {
            println!("# {}", self.get_config_path().display());
            println!("{}", self.config.to_toml()?);
        }

        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }
}
