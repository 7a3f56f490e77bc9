//! CSV reading
//!
//! Accepts RFC 4180 input: quoted fields may hold the delimiter, doubled
//! quotes and line breaks. `\n`, `\r` and `\r\n` all end a record.

use crate::error::Result;
use crate::export::writers::csv::delimiter_byte;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A parsed CSV document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl CsvTable {
    /// Position of a column in the header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

/// Parse CSV bytes; the first record is the header
///
/// A leading UTF-8 byte order mark is skipped and blank lines are ignored.
/// Records may be shorter or longer than the header. A line holding only
/// `""` is a record with one empty field.
pub fn parse_csv(data: &[u8], delimiter: char) -> Result<CsvTable> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let mut records = records.into_iter();
    let header = records.next().unwrap_or_default();
    Ok(CsvTable {
        header,
        records: records.collect(),
    })
}
