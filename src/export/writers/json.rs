//! JSON writer for export operations
//!
//! Writes the whole export as one pretty-printed array with 2-space
//! indentation. Each object keeps its row's own key order and nested
//! values keep their JSON structure.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::coerce::JsonRecord;
use crate::error::Result;
use crate::model::Row;

use super::FormatWriter;

const INDENT: &[u8] = b"  ";

/// Writer for a JSON array of objects
pub struct JsonWriter<W> {
    /// Byte sink
    out: W,
    /// Number of rows written
    written: usize,
}

impl<W: AsyncWrite + Unpin + Send> JsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Give back the sink
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Pretty-print one record as an array element, one level deep
fn render_element(row: &Row) -> Result<String> {
    let mut buf = Vec::new();
    {
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
        JsonRecord(row).serialize(&mut ser)?;
    }

    // JSON text never has raw line breaks inside strings, so every line
    // break here is structural.
    let text = String::from_utf8_lossy(&buf);
    let mut element = String::with_capacity(buf.len() + 16);
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            element.push('\n');
        }
        element.push_str("  ");
        element.push_str(line);
    }
    Ok(element)
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FormatWriter for JsonWriter<W> {
    async fn write_batch(&mut self, rows: &[Row]) -> Result<usize> {
        for row in rows {
            let opening: &[u8] = if self.written == 0 { b"[\n" } else { b",\n" };
            self.out.write_all(opening).await?;
            self.out.write_all(render_element(row)?.as_bytes()).await?;
            self.written += 1;
        }

        debug!("Wrote {} rows to JSON (total: {})", rows.len(), self.written);
        Ok(rows.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        let closing: &[u8] = if self.written == 0 { b"[]\n" } else { b"\n]\n" };
        self.out.write_all(closing).await?;
        self.out.flush().await?;
        debug!("Finalized JSON output ({} rows)", self.written);
        Ok(())
    }

    fn written(&self) -> usize {
        self.written
    }
}
