//! CSV writer for export operations
//!
//! One header row, then one line per row. Cells pass through
//! [`CellConverter`]; a row without a value for a column gets an empty cell.
//! Fields are quoted only when they hold the delimiter, a quote or a line
//! break. A record made of a single empty field is written as `""` so it
//! cannot be read back as a blank line.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::coerce::CellConverter;
use crate::error::{InputError, Result};
use crate::model::Row;

use super::FormatWriter;

/// Writer for CSV format
pub struct CsvWriter<W> {
    /// Byte sink
    out: W,
    /// Column headers, in output order
    columns: Vec<String>,
    /// Field delimiter
    delimiter: char,
    /// Whether headers have been written
    headers_written: bool,
    /// Number of rows written
    written: usize,
    /// Converter for values to cell text
    converter: CellConverter,
}

impl<W: AsyncWrite + Unpin + Send> CsvWriter<W> {
    /// Create a new CSV writer
    ///
    /// # Arguments
    /// * `out` - Byte sink
    /// * `columns` - Header, in the order cells are written
    /// * `delimiter` - Field delimiter
    pub fn new(out: W, columns: Vec<String>, delimiter: char) -> Self {
        Self {
            out,
            columns,
            delimiter,
            headers_written: false,
            written: 0,
            converter: CellConverter::new(),
        }
    }

    /// Give back the sink
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Encode records with minimal quoting and write them out
    async fn write_records(&mut self, records: &[Vec<String>]) -> Result<()> {
        let mut encoder = csv::WriterBuilder::new()
            .delimiter(delimiter_byte(self.delimiter)?)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        for record in records {
            encoder.write_record(record)?;
        }
        let bytes = encoder.into_inner().map_err(|e| e.into_error())?;
        self.out.write_all(&bytes).await?;
        Ok(())
    }

    async fn write_headers(&mut self) -> Result<()> {
        self.headers_written = true;
        // nothing to describe, not even an empty header line
        if self.columns.is_empty() {
            return Ok(());
        }
        self.write_records(&[self.columns.clone()]).await?;
        debug!("Wrote CSV headers: {} fields", self.columns.len());
        Ok(())
    }
}

/// Byte form of a delimiter; only ASCII delimiters fit in one byte
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(InputError::InvalidOption {
            option: "delimiter".to_string(),
            value: delimiter.to_string(),
        }
        .into())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FormatWriter for CsvWriter<W> {
    async fn write_batch(&mut self, rows: &[Row]) -> Result<usize> {
        if !self.headers_written {
            self.write_headers().await?;
        }

        if !self.columns.is_empty() {
            let records: Vec<Vec<String>> = rows
                .iter()
                .map(|row| {
                    self.columns
                        .iter()
                        .map(|c| self.converter.cell_text(row.get(c)))
                        .collect()
                })
                .collect();
            self.write_records(&records).await?;
        }

        self.written += rows.len();
        debug!("Wrote {} rows to CSV (total: {})", rows.len(), self.written);
        Ok(rows.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        if !self.headers_written {
            self.write_headers().await?;
        }
        self.out.flush().await?;
        debug!("Finalized CSV output ({} rows)", self.written);
        Ok(())
    }

    fn written(&self) -> usize {
        self.written
    }
}
