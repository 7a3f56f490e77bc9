//! Column filter for existing CSV files
//!
//! Reads a CSV export, keeps the requested columns in the requested order
//! and writes the result to a new file. Column checks follow the same rules
//! as a projected export: unknown columns fail unless ignored.

pub mod reader;

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{InputError, Result};
use crate::export::{CsvWriter, FormatWriter, OutputTarget, Sink};
use crate::model::{AttributeValue, Row};
use crate::project::{ColumnSet, normalize_columns, resolve_columns};

pub use reader::{CsvTable, parse_csv};

/// Options for one filter run
#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Requested columns; entries may be comma-joined
    pub columns: Vec<String>,
    pub ignore_missing: bool,
    /// Delimiter of both input and output
    pub delimiter: char,
}

/// Result of a filter run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSummary {
    pub rows: usize,
    pub columns: ColumnSet,
}

/// Filter the columns of a CSV file
pub async fn filter_csv(options: &FilterOptions) -> Result<FilterSummary> {
    if !options.input.is_file() {
        return Err(InputError::FileNotFound(options.input.display().to_string()).into());
    }

    let data = tokio::fs::read(&options.input).await?;
    let table = parse_csv(&data, options.delimiter)?;
    debug!(
        "Read {} records with {} columns from {}",
        table.records.len(),
        table.header.len(),
        options.input.display()
    );

    let wanted = normalize_columns(&options.columns);
    let columns = resolve_columns(&table.header, &wanted, options.ignore_missing)?;
    let rows = select(&table, &columns);

    let sink = Sink::open(&OutputTarget::File(options.output.clone())).await?;
    let mut writer = CsvWriter::new(sink, columns.clone(), options.delimiter);
    let outcome = async {
        writer.write_batch(&rows).await?;
        writer.finalize().await
    }
    .await;

    let sink = writer.into_inner();
    match outcome {
        Ok(()) => sink.commit().await?,
        Err(e) => {
            sink.abort().await;
            return Err(e);
        }
    }

    info!(
        "Wrote {} rows with columns [{}] to {}",
        rows.len(),
        columns.join(", "),
        options.output.display()
    );

    Ok(FilterSummary {
        rows: rows.len(),
        columns,
    })
}

/// Build rows holding only `columns`; short records leave cells empty
fn select(table: &CsvTable, columns: &[String]) -> Vec<Row> {
    let indices: Vec<(&String, Option<usize>)> = columns
        .iter()
        .map(|c| (c, table.column_index(c)))
        .collect();

    table
        .records
        .iter()
        .map(|record| {
            indices
                .iter()
                .filter_map(|(name, index)| {
                    let value = record.get((*index)?)?;
                    Some((name.as_str(), AttributeValue::String(value.clone())))
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::CellConverter;
    use crate::error::{ExportError, ProjectionError};
    use std::path::Path;

    fn options(input: &Path, output: &Path, columns: &[&str], ignore: bool) -> FilterOptions {
        FilterOptions {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            ignore_missing: ignore,
            delimiter: ',',
        }
    }

    #[tokio::test]
    async fn test_keeps_caller_order_and_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("nested").join("out.csv");
        std::fs::write(&input, "a,b,c\n1,2,3\n4,5\n").unwrap();

        let summary = filter_csv(&options(&input, &output, &["c,a"], false))
            .await
            .unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, vec!["c", "a"]);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "c,a\n3,1\n,4\n");
    }

    #[tokio::test]
    async fn test_missing_column_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, "a,b\n1,2\n").unwrap();

        let err = filter_csv(&options(&input, &output, &["a", "c"], false))
            .await
            .unwrap_err();
        match err {
            ExportError::Projection(ProjectionError::SchemaMismatch { missing }) => {
                assert_eq!(missing, vec!["c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());

        filter_csv(&options(&input, &output, &["a", "c"], true))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "a\n1\n");
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = filter_csv(&options(
            &dir.path().join("absent.csv"),
            &dir.path().join("out.csv"),
            &["a"],
            false,
        ))
        .await
        .unwrap_err();
        assert!(matches!(err, ExportError::Input(InputError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_single_column_round_trip_keeps_empty_cells() {
        let rows: Vec<Row> = vec![
            [("a", AttributeValue::from(1i64))].into_iter().collect(),
            [("b", AttributeValue::from(2i64))].into_iter().collect(),
            [("a", AttributeValue::from(3i64))].into_iter().collect(),
        ];

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.csv");
        let output = dir.path().join("filtered.csv");

        let sink = Sink::open(&OutputTarget::File(input.clone())).await.unwrap();
        let mut writer = CsvWriter::new(sink, vec!["a".to_string()], ',');
        writer.write_batch(&rows).await.unwrap();
        writer.finalize().await.unwrap();
        writer.into_inner().commit().await.unwrap();

        let summary = filter_csv(&options(&input, &output, &["a"], false))
            .await
            .unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "a\n1\n\"\"\n3\n");
    }

    #[tokio::test]
    async fn test_round_trip_reproduces_cells() {
        let rows: Vec<Row> = vec![
            [
                ("amount", AttributeValue::number("12.50").unwrap()),
                ("count", AttributeValue::number("3.0").unwrap()),
                ("note", AttributeValue::from("said \"hi\", then\nleft")),
            ]
            .into_iter()
            .collect(),
            [("note", AttributeValue::from("Zoë"))].into_iter().collect(),
        ];
        let columns: Vec<String> = vec!["amount".into(), "count".into(), "note".into()];

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.csv");
        let output = dir.path().join("filtered.csv");

        let sink = Sink::open(&OutputTarget::File(input.clone())).await.unwrap();
        let mut writer = CsvWriter::new(sink, columns.clone(), ',');
        writer.write_batch(&rows).await.unwrap();
        writer.finalize().await.unwrap();
        writer.into_inner().commit().await.unwrap();

        filter_csv(&options(&input, &output, &["amount", "count", "note"], false))
            .await
            .unwrap();

        let table = parse_csv(&std::fs::read(&output).unwrap(), ',').unwrap();
        assert_eq!(table.header, columns);

        let converter = CellConverter::new();
        let expected: Vec<Vec<String>> = rows
            .iter()
            .map(|row| columns.iter().map(|c| converter.cell_text(row.get(c))).collect())
            .collect();
        assert_eq!(table.records, expected);
        assert_eq!(table.records[0][..2], ["12.5".to_string(), "3".to_string()]);
    }
}
