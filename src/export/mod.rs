//! Export of a whole collection to CSV or JSON
//!
//! The export system is built on three components:
//!
//! 1. **PaginatedFetcher** ([`crate::fetch`]): materializes every row
//! 2. **FormatWriter**: writes rows as CSV or as a JSON array
//! 3. **Sink**: a file (written atomically) or stdout
//!
//! [`run_export`] wires them together with sorting and column selection.
//!
//! # Example
//!
//! ```no_run
//! # async fn demo(source: &dyn flatexport::fetch::PageSource) -> flatexport::error::Result<()> {
//! use flatexport::export::{ExportFormat, ExportOptions, OutputTarget, run_export};
//!
//! let mut options = ExportOptions::new("orders");
//! options.format = ExportFormat::Json;
//! options.output = OutputTarget::Stdout;
//! let summary = run_export(source, &options).await?;
//! eprintln!("{} rows", summary.rows);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod sink;
pub mod writers;

pub use coordinator::{ExportFormat, ExportOptions, ExportSummary, SortSpec, run_export};
pub use sink::{OutputTarget, Sink};
pub use writers::{CsvWriter, FormatWriter, JsonWriter};
