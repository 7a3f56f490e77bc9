//! Export coordinator
//!
//! Runs one export end to end: check options, fetch every page, sort,
//! project, then write. Every fatal condition is raised before the sink is
//! opened, so a failed run writes nothing.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::{InputError, Result};
use crate::fetch::{PageSource, PaginatedFetcher, ProgressTracker, RetryPolicy};
use crate::model::Row;
use crate::project::{ColumnSet, normalize_columns, project, union_columns};
use crate::sort::{SortDirection, sort_rows};
use crate::utils::time::date_bound_to_millis;
use crate::utils::validate::is_valid_collection_name;

use super::sink::{OutputTarget, Sink};
use super::writers::{CsvWriter, FormatWriter, JsonWriter};

/// Output format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    /// File extension for the format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Sort step of an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub attribute: String,
    pub direction: SortDirection,
}

/// Options for one export run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Collection to export
    pub collection: String,
    /// Attribute the date bounds apply to
    pub date_attr: String,
    /// Inclusive lower date bound, as given by the user
    pub start: Option<String>,
    /// Inclusive upper date bound, as given by the user
    pub end: Option<String>,
    pub format: ExportFormat,
    pub output: OutputTarget,
    /// CSV field delimiter
    pub delimiter: char,
    /// Sort step; `None` keeps store order
    pub sort: Option<SortSpec>,
    /// Column list; `None` exports every column
    pub columns: Option<Vec<String>>,
    /// Drop unknown columns instead of failing
    pub ignore_missing: bool,
    /// Documents scanned per page
    pub page_size: u32,
    pub retry: RetryPolicy,
    /// Show a spinner while fetching
    pub progress: bool,
}

impl ExportOptions {
    /// Options with defaults for everything but the collection
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            date_attr: "created_at".to_string(),
            start: None,
            end: None,
            format: ExportFormat::Csv,
            output: OutputTarget::File(crate::utils::fs::default_output_path(collection, "csv")),
            delimiter: ',',
            sort: None,
            columns: None,
            ignore_missing: false,
            page_size: 1000,
            retry: RetryPolicy::none(),
            progress: false,
        }
    }

    /// Parse the date bounds into epoch milliseconds
    ///
    /// Also rejects collection names the store cannot hold, so a bad
    /// argument fails before any network round trip.
    pub fn resolve_bounds(&self) -> Result<(Option<i64>, Option<i64>)> {
        if !is_valid_collection_name(&self.collection) {
            return Err(InputError::InvalidOption {
                option: "collection".to_string(),
                value: self.collection.clone(),
            }
            .into());
        }
        if self.page_size == 0 {
            return Err(InputError::InvalidOption {
                option: "page-size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        let start = self.start.as_deref().map(date_bound_to_millis).transpose()?;
        let end = self.end.as_deref().map(date_bound_to_millis).transpose()?;
        Ok((start, end))
    }
}

/// Result of an export operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Rows written
    pub rows: usize,
    /// Columns in the output (CSV header or projection)
    pub columns: ColumnSet,
    /// Pages fetched from the store
    pub pages: u64,
    /// Where the output went
    pub output: String,
    /// Wall time of the whole run
    pub elapsed_ms: u64,
}

/// Run one export against a page source
///
/// # Arguments
/// * `source` - Store capability to read pages from
/// * `options` - What to export and how
///
/// # Returns
/// * `Result<ExportSummary>` - Statistics of the written output
pub async fn run_export(source: &dyn PageSource, options: &ExportOptions) -> Result<ExportSummary> {
    let start_time = Instant::now();

    let (start, end) = options.resolve_bounds()?;

    info!("Starting export of '{}'", options.collection);
    let fetched = PaginatedFetcher::new(source, options.page_size)
        .with_retry(options.retry)
        .with_progress(ProgressTracker::new(options.progress))
        .fetch(&options.collection, &options.date_attr, start, end)
        .await?;
    let pages = fetched.pages;
    let mut rows = fetched.rows;

    if let Some(sort) = &options.sort {
        sort_rows(&mut rows, &sort.attribute, sort.direction);
    }

    let (columns, rows) = select_columns(rows, options)?;
    debug!("Writing {} rows with {} columns", rows.len(), columns.len());

    let sink = Sink::open(&options.output).await?;
    let written = write_rows(sink, &rows, &columns, options).await?;

    let elapsed_ms = start_time.elapsed().as_millis() as u64;
    info!(
        "Export completed: {} rows, {} columns, {} pages, {} ms",
        written,
        columns.len(),
        pages,
        elapsed_ms
    );

    Ok(ExportSummary {
        rows: written,
        columns,
        pages,
        output: options.output.describe(),
        elapsed_ms,
    })
}

fn select_columns(rows: Vec<Row>, options: &ExportOptions) -> Result<(ColumnSet, Vec<Row>)> {
    match &options.columns {
        Some(wanted) => project(&rows, &normalize_columns(wanted), options.ignore_missing),
        None => Ok((union_columns(&rows), rows)),
    }
}

/// Serialize into the sink, committing on success and discarding on failure
async fn write_rows(
    sink: Sink,
    rows: &[Row],
    columns: &[String],
    options: &ExportOptions,
) -> Result<usize> {
    let mut writer: Box<dyn WriterInto> = match options.format {
        ExportFormat::Csv => Box::new(CsvWriter::new(sink, columns.to_vec(), options.delimiter)),
        ExportFormat::Json => Box::new(JsonWriter::new(sink)),
    };

    let outcome = async {
        writer.write_batch(rows).await?;
        writer.finalize().await
    }
    .await;

    let sink = writer.into_sink();
    match outcome {
        Ok(()) => {
            sink.commit().await?;
            Ok(rows.len())
        }
        Err(e) => {
            sink.abort().await;
            Err(e)
        }
    }
}

/// A format writer that can hand its sink back
trait WriterInto: FormatWriter {
    fn into_sink(self: Box<Self>) -> Sink;
}

impl WriterInto for CsvWriter<Sink> {
    fn into_sink(self: Box<Self>) -> Sink {
        (*self).into_inner()
    }
}

impl WriterInto for JsonWriter<Sink> {
    fn into_sink(self: Box<Self>) -> Sink {
        (*self).into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExportError, FetchError, ProjectionError};
    use crate::fetch::{Page, PageRequest};
    use crate::model::AttributeValue;
    use async_trait::async_trait;

    /// Serves every row in a single page
    struct OnePage {
        rows: Vec<Row>,
        exists: bool,
    }

    #[async_trait]
    impl PageSource for OnePage {
        async fn collection_exists(&self, _collection: &str) -> Result<bool> {
            Ok(self.exists)
        }

        async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
            let rows = match &request.predicate {
                Some(p) => self.rows.iter().filter(|r| p.matches(r)).cloned().collect(),
                None => self.rows.clone(),
            };
            Ok(Page { rows, token: None })
        }
    }

    fn scenario() -> OnePage {
        let rows = vec![
            [("id", AttributeValue::from(1i64)), ("created_date", "2023-01-02".into())]
                .into_iter()
                .collect(),
            [("id", AttributeValue::from(2i64)), ("created_date", "2023-01-01".into())]
                .into_iter()
                .collect(),
            [("id", AttributeValue::from(3i64))].into_iter().collect(),
        ];
        OnePage { rows, exists: true }
    }

    fn options(dir: &std::path::Path, format: ExportFormat) -> ExportOptions {
        let mut options = ExportOptions::new("orders");
        options.format = format;
        options.output = OutputTarget::File(dir.join(format!("orders.{}", format.extension())));
        options.sort = Some(SortSpec {
            attribute: "created_date".to_string(),
            direction: SortDirection::Ascending,
        });
        options
    }

    #[tokio::test]
    async fn test_concrete_scenario_csv() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), ExportFormat::Csv);

        let summary = run_export(&scenario(), &opts).await.unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.columns, vec!["created_date", "id"]);

        let text = std::fs::read_to_string(dir.path().join("orders.csv")).unwrap();
        assert_eq!(text, "created_date,id\n2023-01-01,2\n2023-01-02,1\n,3\n");
    }

    #[tokio::test]
    async fn test_json_keeps_row_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), ExportFormat::Json);
        run_export(&scenario(), &opts).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("orders.json")).unwrap();
        assert!(text.starts_with("[\n  {\n    \"id\": 2,\n    \"created_date\": \"2023-01-01\"\n  },"));
        assert!(text.ends_with("  {\n    \"id\": 3\n  }\n]\n"));
    }

    #[tokio::test]
    async fn test_projection_applies_to_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path(), ExportFormat::Csv);
        opts.columns = Some(vec!["id".to_string(), "missing".to_string()]);
        opts.ignore_missing = true;

        let summary = run_export(&scenario(), &opts).await.unwrap();
        assert_eq!(summary.columns, vec!["id"]);
        let text = std::fs::read_to_string(dir.path().join("orders.csv")).unwrap();
        assert_eq!(text, "id\n2\n1\n3\n");
    }

    #[tokio::test]
    async fn test_schema_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path(), ExportFormat::Csv);
        opts.columns = Some(vec!["nope".to_string()]);

        let err = run_export(&scenario(), &opts).await.unwrap_err();
        assert!(matches!(
            err,
            ExportError::Projection(ProjectionError::SchemaMismatch { .. })
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_collection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = OnePage {
            rows: Vec::new(),
            exists: false,
        };
        let err = run_export(&source, &options(dir.path(), ExportFormat::Json))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Fetch(FetchError::NotFound(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_bad_date_fails_before_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path(), ExportFormat::Csv);
        opts.start = Some("yesterday-ish".to_string());

        let source = OnePage {
            rows: Vec::new(),
            exists: false,
        };
        let err = run_export(&source, &opts).await.unwrap_err();
        assert!(matches!(err, ExportError::Input(InputError::InvalidDateFormat(_))));
    }

    #[tokio::test]
    async fn test_empty_result_writes_empty_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let source = OnePage {
            rows: Vec::new(),
            exists: true,
        };
        run_export(&source, &options(dir.path(), ExportFormat::Csv)).await.unwrap();
        run_export(&source, &options(dir.path(), ExportFormat::Json)).await.unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("orders.csv")).unwrap(), "");
        assert_eq!(std::fs::read_to_string(dir.path().join("orders.json")).unwrap(), "[]\n");
    }

    #[tokio::test]
    async fn test_date_bounds_filter_numeric_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            [("id", AttributeValue::from(1i64)), ("created_at", AttributeValue::from(1_672_531_200_000i64))]
                .into_iter()
                .collect(),
            [("id", AttributeValue::from(2i64)), ("created_at", AttributeValue::from(1_672_704_000_000i64))]
                .into_iter()
                .collect(),
        ];
        let source = OnePage { rows, exists: true };

        let mut opts = options(dir.path(), ExportFormat::Csv);
        opts.sort = None;
        opts.start = Some("2023-01-02".to_string());
        run_export(&source, &opts).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("orders.csv")).unwrap();
        assert_eq!(text, "created_at,id\n1672704000000,2\n");
    }

    #[test]
    fn test_resolve_bounds() {
        let mut opts = ExportOptions::new("orders");
        opts.start = Some("2023-01-01".to_string());
        opts.end = Some("2023-01-01T00:00:01Z".to_string());
        assert_eq!(
            opts.resolve_bounds().unwrap(),
            (Some(1_672_531_200_000), Some(1_672_531_201_000))
        );

        let opts = ExportOptions::new("bad$name");
        assert!(opts.resolve_bounds().is_err());
    }
}
