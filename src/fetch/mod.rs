//! Paginated fetching of a whole collection
//!
//! This module drives a multi-round scan against the store:
//! - [`PageSource`]: the store capability, one page per call
//! - [`PaginatedFetcher`]: loops over continuation tokens and accumulates rows
//! - [`ProgressTracker`]: spinner feedback while pages arrive
//!
//! # Architecture
//!
//! The fetcher never talks to MongoDB directly. It is handed a
//! `PageSource` (the live one lives in [`crate::connection`]) so the paging
//! loop can be driven by stub sources in tests.
//!
//! Pages are requested strictly one after another: the token returned with
//! page *n* is needed to ask for page *n + 1*.

pub mod progress;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use mongodb::bson::Bson;
use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};
use crate::model::{AttributeValue, Row, RowSet};

pub use progress::ProgressTracker;

/// Opaque marker telling the store where the next page starts
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationToken(Bson);

impl ContinuationToken {
    pub fn new(position: Bson) -> Self {
        Self(position)
    }

    pub fn position(&self) -> &Bson {
        &self.0
    }
}

/// Inclusive range filter on a numeric attribute, bounds in epoch millis
#[derive(Debug, Clone, PartialEq)]
pub struct RangePredicate {
    pub attribute: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl RangePredicate {
    /// Build a predicate; `None` when neither bound is given
    pub fn new(attribute: &str, start: Option<i64>, end: Option<i64>) -> Option<Self> {
        if start.is_none() && end.is_none() {
            return None;
        }
        Some(Self {
            attribute: attribute.to_string(),
            start,
            end,
        })
    }

    /// Whether a row satisfies the predicate
    ///
    /// Only numeric values can match; absent or non-numeric values never do.
    pub fn matches(&self, row: &Row) -> bool {
        let Some(AttributeValue::Number(value)) = row.get(&self.attribute) else {
            return false;
        };
        let above = self
            .start
            .is_none_or(|start| *value >= bigdecimal::BigDecimal::from(start));
        let below = self
            .end
            .is_none_or(|end| *value <= bigdecimal::BigDecimal::from(end));
        above && below
    }
}

/// One page request against the store
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub collection: String,
    pub predicate: Option<RangePredicate>,
    pub page_size: u32,
    pub token: Option<ContinuationToken>,
}

/// One page of results; no token means the scan is complete
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub rows: Vec<Row>,
    pub token: Option<ContinuationToken>,
}

/// Capability to read a collection one page at a time
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Check whether the collection exists
    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    /// Fetch the page described by `request`
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page>;
}

/// Bounded retry with exponential backoff for transient page failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Delay before the first retry; doubled for each further retry
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// A policy that fails on the first error
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    fn delay(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << retry.min(16))
    }
}

/// Rows accumulated by a complete scan
#[derive(Debug, Default)]
pub struct FetchResult {
    pub rows: RowSet,
    pub pages: u64,
    pub elapsed_ms: u64,
}

/// Drives a scan over every page of a collection
pub struct PaginatedFetcher<'a> {
    source: &'a dyn PageSource,
    page_size: u32,
    retry: RetryPolicy,
    tracker: ProgressTracker,
}

impl<'a> PaginatedFetcher<'a> {
    /// Create a new fetcher
    ///
    /// # Arguments
    /// * `source` - Store capability to read pages from
    /// * `page_size` - Rows scanned per page
    pub fn new(source: &'a dyn PageSource, page_size: u32) -> Self {
        Self {
            source,
            page_size,
            retry: RetryPolicy::none(),
            tracker: ProgressTracker::new(false),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress(mut self, tracker: ProgressTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Fetch every row of a collection, optionally restricted to a time range
    ///
    /// # Arguments
    /// * `collection` - Collection to scan
    /// * `date_attr` - Attribute the range applies to
    /// * `start` - Inclusive lower bound in epoch millis
    /// * `end` - Inclusive upper bound in epoch millis
    ///
    /// # Returns
    /// * `Result<FetchResult>` - All matching rows, or the first fatal error
    pub async fn fetch(
        &self,
        collection: &str,
        date_attr: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<FetchResult> {
        let result = self.scan(collection, date_attr, start, end).await;
        self.tracker.finish();
        result
    }

    async fn scan(
        &self,
        collection: &str,
        date_attr: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<FetchResult> {
        let start_time = Instant::now();

        if !self.source.collection_exists(collection).await? {
            return Err(FetchError::NotFound(collection.to_string()).into());
        }

        let mut request = PageRequest {
            collection: collection.to_string(),
            predicate: RangePredicate::new(date_attr, start, end),
            page_size: self.page_size,
            token: None,
        };

        info!(
            "Scanning '{}' ({})",
            collection,
            match &request.predicate {
                Some(p) => format!("{} in [{:?}, {:?}]", p.attribute, p.start, p.end),
                None => "no filter".to_string(),
            }
        );

        let mut rows = RowSet::new();
        let mut pages = 0u64;

        loop {
            debug!("Fetching page #{}", pages + 1);
            let page = self.fetch_with_retry(&request).await?;
            pages += 1;

            debug!("Received page of {} rows", page.rows.len());
            rows.extend(page.rows);
            self.tracker.update(rows.len() as u64, pages);

            match page.token {
                Some(token) => request.token = Some(token),
                None => break,
            }
        }

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Fetched {} rows from '{}' in {} pages ({} ms)",
            rows.len(),
            collection,
            pages,
            elapsed_ms
        );

        Ok(FetchResult {
            rows,
            pages,
            elapsed_ms,
        })
    }

    async fn fetch_with_retry(&self, request: &PageRequest) -> Result<Page> {
        let mut retry = 0u32;
        loop {
            match self.source.fetch_page(request).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && retry < self.retry.retries => {
                    let delay = self.retry.delay(retry);
                    retry += 1;
                    warn!(
                        "Transient page failure, retry {}/{} in {:?}: {}",
                        retry, self.retry.retries, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() && self.retry.retries > 0 => {
                    return Err(FetchError::RetriesExhausted {
                        attempts: retry + 1,
                        message: e.to_string(),
                    }
                    .into());
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn numbered_row(id: i64, created_at: i64) -> Row {
        let mut row = Row::new();
        row.insert("id", AttributeValue::from(id));
        row.insert("created_at", AttributeValue::from(created_at));
        row
    }

    /// Serves pre-built pages; the token is the index of the next page.
    struct StubSource {
        pages: Vec<Vec<Row>>,
        exists: bool,
        calls: AtomicUsize,
        seen: Mutex<Vec<PageRequest>>,
        failures: Mutex<Vec<ExportError>>,
    }

    impl StubSource {
        fn new(pages: Vec<Vec<Row>>) -> Self {
            Self {
                pages,
                exists: true,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                failures: Mutex::new(Vec::new()),
            }
        }

        fn with_pages(count: usize, per_page: usize) -> Self {
            let pages = (0..count)
                .map(|p| {
                    (0..per_page)
                        .map(|i| {
                            let id = (p * per_page + i) as i64;
                            numbered_row(id, id * 1000)
                        })
                        .collect()
                })
                .collect();
            Self::new(pages)
        }

        fn missing() -> Self {
            Self {
                exists: false,
                ..Self::new(vec![vec![numbered_row(1, 1)]])
            }
        }

        fn failing_with(self, failures: Vec<ExportError>) -> Self {
            *self.failures.lock().unwrap() = failures;
            self
        }
    }

    #[async_trait]
    impl PageSource for StubSource {
        async fn collection_exists(&self, _collection: &str) -> Result<bool> {
            Ok(self.exists)
        }

        async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());

            if let Some(err) = self.failures.lock().unwrap().pop() {
                return Err(err);
            }

            let index = match request.token.as_ref().map(|t| t.position()) {
                Some(Bson::Int64(i)) => *i as usize,
                None => 0,
                Some(other) => panic!("unexpected token: {other:?}"),
            };
            let rows = self.pages.get(index).cloned().unwrap_or_default();
            let rows = match &request.predicate {
                Some(p) => rows.into_iter().filter(|r| p.matches(r)).collect(),
                None => rows,
            };
            let token = (index + 1 < self.pages.len())
                .then(|| ContinuationToken::new(Bson::Int64(index as i64 + 1)));
            Ok(Page { rows, token })
        }
    }

    fn transient() -> ExportError {
        FetchError::PageFailed {
            transient: true,
            message: "connection reset".to_string(),
        }
        .into()
    }

    fn fast_retry(retries: u32) -> RetryPolicy {
        RetryPolicy::new(retries, Duration::from_millis(1))
    }

    async fn assert_complete(page_count: usize) {
        let source = StubSource::with_pages(page_count, 7);
        let fetcher = PaginatedFetcher::new(&source, 7);
        let result = fetcher.fetch("orders", "created_at", None, None).await.unwrap();

        assert_eq!(result.rows.len(), page_count * 7);
        assert_eq!(result.pages, page_count as u64);

        let unique: HashSet<String> = result
            .rows
            .iter()
            .map(|r| format!("{:?}", r.get("id")))
            .collect();
        assert_eq!(unique.len(), page_count * 7);
    }

    #[tokio::test]
    async fn test_single_page() {
        assert_complete(1).await;
    }

    #[tokio::test]
    async fn test_two_pages() {
        assert_complete(2).await;
    }

    #[tokio::test]
    async fn test_fifty_pages() {
        assert_complete(50).await;
    }

    #[tokio::test]
    async fn test_tokens_are_chained() {
        let source = StubSource::with_pages(3, 2);
        let fetcher = PaginatedFetcher::new(&source, 2);
        fetcher.fetch("orders", "created_at", None, None).await.unwrap();

        let seen = source.seen.lock().unwrap();
        let tokens: Vec<Option<Bson>> = seen
            .iter()
            .map(|r| r.token.as_ref().map(|t| t.position().clone()))
            .collect();
        assert_eq!(
            tokens,
            vec![None, Some(Bson::Int64(1)), Some(Bson::Int64(2))]
        );
    }

    #[tokio::test]
    async fn test_predicate_does_not_change_page_count() {
        let source = StubSource::with_pages(4, 5);
        let fetcher = PaginatedFetcher::new(&source, 5);
        // ids 0..20, created_at = id * 1000; keep 3..=6
        let result = fetcher
            .fetch("orders", "created_at", Some(3000), Some(6000))
            .await
            .unwrap();

        assert_eq!(result.rows.len(), 4);
        assert_eq!(result.pages, 4);

        let seen = source.seen.lock().unwrap();
        let predicate = seen[0].predicate.clone().unwrap();
        assert_eq!(predicate.attribute, "created_at");
        assert_eq!((predicate.start, predicate.end), (Some(3000), Some(6000)));
    }

    #[tokio::test]
    async fn test_one_sided_bounds() {
        let source = StubSource::with_pages(2, 5);
        let fetcher = PaginatedFetcher::new(&source, 5);

        let from = fetcher
            .fetch("orders", "created_at", Some(8000), None)
            .await
            .unwrap();
        assert_eq!(from.rows.len(), 2);

        let until = fetcher
            .fetch("orders", "created_at", None, Some(1000))
            .await
            .unwrap();
        assert_eq!(until.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_collection_fails_before_paging() {
        let source = StubSource::missing();
        let fetcher = PaginatedFetcher::new(&source, 10);
        let err = fetcher
            .fetch("ghost", "created_at", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Fetch(FetchError::NotFound(ref name)) if name == "ghost"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let source = StubSource::with_pages(2, 3).failing_with(vec![transient(), transient()]);
        let fetcher = PaginatedFetcher::new(&source, 3).with_retry(fast_retry(3));
        let result = fetcher.fetch("orders", "created_at", None, None).await.unwrap();

        assert_eq!(result.rows.len(), 6);
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let failures = (0..5).map(|_| transient()).collect();
        let source = StubSource::with_pages(1, 3).failing_with(failures);
        let fetcher = PaginatedFetcher::new(&source, 3).with_retry(fast_retry(2));
        let err = fetcher
            .fetch("orders", "created_at", None, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExportError::Fetch(FetchError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_failure_aborts_without_retry() {
        let fatal: ExportError = FetchError::PageFailed {
            transient: false,
            message: "unauthorized".to_string(),
        }
        .into();
        let source = StubSource::with_pages(3, 3).failing_with(vec![fatal]);
        let fetcher = PaginatedFetcher::new(&source, 3).with_retry(fast_retry(3));

        assert!(fetcher.fetch("orders", "created_at", None, None).await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_predicate_requires_numeric_value() {
        let predicate = RangePredicate::new("created_at", Some(10), None).unwrap();
        let mut row = Row::new();
        assert!(!predicate.matches(&row));
        row.insert("created_at", AttributeValue::from("20"));
        assert!(!predicate.matches(&row));
        row.insert("created_at", AttributeValue::from(10i64));
        assert!(predicate.matches(&row));
        assert!(RangePredicate::new("created_at", None, None).is_none());
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
    }
}
