//! flatexport library
//!
//! Core functionality of the flatexport tool: page through a schema-less
//! collection, order rows by an attribute of unknown type, and write them
//! as CSV or JSON.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `coerce`: Scalar coercion of values for output
//! - `config`: Configuration management
//! - `connection`: MongoDB connection and page source
//! - `error`: Error types and handling
//! - `export`: Export pipeline, writers and sinks
//! - `fetch`: Paginated fetching with retries
//! - `filter`: Column filter for existing CSV files
//! - `model`: Rows and attribute values
//! - `project`: Column selection
//! - `sort`: Mixed-type row ordering
//! - `utils`: Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use flatexport::{config::Config, connection::ConnectionManager};
//! use flatexport::export::{ExportOptions, run_export};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut manager = ConnectionManager::new(
//!         "mongodb://localhost:27017".to_string(),
//!         config.connection,
//!     );
//!     manager.connect().await?;
//!
//!     let source = manager.page_source("shop")?;
//!     let summary = run_export(&source, &ExportOptions::new("orders")).await?;
//!     println!("{} rows written", summary.rows);
//!
//!     manager.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod coerce;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod model;
pub mod project;
pub mod sort;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{ExportError, Result};
pub use export::{ExportOptions, ExportSummary, run_export};
pub use model::{AttributeValue, Row};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
