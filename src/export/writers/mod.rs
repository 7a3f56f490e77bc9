//! Format writers for export operations
//!
//! Writers are generic over any async byte sink, so the same code writes to
//! a file, stdout or an in-memory buffer.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Row;

pub mod csv;
pub mod json;

pub use self::csv::CsvWriter;
pub use self::json::JsonWriter;

/// Trait for writing rows to different output formats
#[async_trait]
pub trait FormatWriter: Send {
    /// Write a batch of rows
    ///
    /// # Returns
    /// * `Result<usize>` - Number of rows written
    async fn write_batch(&mut self, rows: &[Row]) -> Result<usize>;

    /// Finalize the output (headers for empty output, closing tokens, flush)
    async fn finalize(&mut self) -> Result<()>;

    /// Rows written so far
    fn written(&self) -> usize;
}
