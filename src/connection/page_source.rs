//! Paging over a MongoDB collection
//!
//! Each page takes two queries. The scan query walks at most `page_size`
//! `_id`s after the previous page, which fixes the page boundary. The
//! fetch query then returns the documents inside that boundary that pass
//! the date range. The range check runs after the boundary is fixed, so a
//! page can come back short or empty while more documents remain; only the
//! scanned count decides whether a continuation token is returned.
//!
//! Every `_id` comparison is an aggregation expression rather than a query
//! operator, so collections mixing `_id` types are walked in full BSON
//! order instead of stopping at the first type change.

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use tracing::{debug, trace};

use crate::error::Result;
use crate::error::mongo::page_error;
use crate::fetch::{ContinuationToken, Page, PageRequest, PageSource, RangePredicate};
use crate::model::AttributeMap;

/// [`PageSource`] backed by a live MongoDB database
pub struct MongoPageSource {
    db: Database,
}

impl MongoPageSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Walk the next `page_size` ids; returns the count and the last id
    async fn scan(
        &self,
        coll: &Collection<Document>,
        request: &PageRequest,
    ) -> Result<(u64, Option<Bson>)> {
        let mut scan_options = FindOptions::default();
        scan_options.sort = Some(doc! { "_id": 1 });
        scan_options.limit = Some(i64::from(request.page_size));
        scan_options.projection = Some(doc! { "_id": 1 });

        let filter = scan_filter(request.token.as_ref());
        trace!("Scan filter: {:?}", filter);

        let mut cursor = coll
            .find(filter)
            .with_options(scan_options)
            .await
            .map_err(page_error)?;

        let mut scanned = 0u64;
        let mut last = None;
        while let Some(id_doc) = cursor.try_next().await.map_err(page_error)? {
            scanned += 1;
            last = id_doc.get("_id").cloned();
        }
        Ok((scanned, last))
    }
}

#[async_trait]
impl PageSource for MongoPageSource {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let names = self
            .db
            .list_collection_names()
            .filter(doc! { "name": collection })
            .await?;
        Ok(names.iter().any(|n| n == collection))
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        let coll = self.db.collection::<Document>(&request.collection);

        let (scanned, last) = self.scan(&coll, request).await?;
        let Some(last) = last else {
            debug!("Nothing left to scan in '{}'", request.collection);
            return Ok(Page::default());
        };

        let mut fetch_options = FindOptions::default();
        fetch_options.sort = Some(doc! { "_id": 1 });

        let filter = page_filter(request, &last);
        trace!("Page filter: {:?}", filter);

        let docs: Vec<Document> = coll
            .find(filter)
            .with_options(fetch_options)
            .await
            .map_err(page_error)?
            .try_collect()
            .await
            .map_err(page_error)?;

        let rows: Vec<AttributeMap> = docs.into_iter().map(AttributeMap::from).collect();
        let token = continuation(scanned, last, request.page_size);

        debug!(
            "Scanned {} documents, kept {} ({})",
            scanned,
            rows.len(),
            if token.is_some() { "more" } else { "last page" }
        );

        Ok(Page { rows, token })
    }
}

fn id_after(token: &ContinuationToken) -> Document {
    doc! { "$gt": ["$_id", token.position().clone()] }
}

/// Filter for the scan query: every id after the token
pub fn scan_filter(token: Option<&ContinuationToken>) -> Document {
    match token {
        Some(token) => doc! { "$expr": id_after(token) },
        None => Document::new(),
    }
}

/// Filter for the fetch query: ids in `(token, last]` that pass the range
pub fn page_filter(request: &PageRequest, last: &Bson) -> Document {
    let mut conditions = Vec::with_capacity(5);
    if let Some(token) = &request.token {
        conditions.push(Bson::Document(id_after(token)));
    }
    conditions.push(Bson::Document(doc! { "$lte": ["$_id", last.clone()] }));
    if let Some(predicate) = &request.predicate {
        conditions.extend(range_conditions(predicate).into_iter().map(Bson::Document));
    }
    doc! { "$expr": { "$and": conditions } }
}

/// Numeric inclusive bounds on the predicate attribute
fn range_conditions(predicate: &RangePredicate) -> Vec<Document> {
    let field = format!("${}", predicate.attribute);
    let mut conditions = vec![doc! { "$isNumber": field.as_str() }];
    if let Some(start) = predicate.start {
        conditions.push(doc! { "$gte": [field.as_str(), start] });
    }
    if let Some(end) = predicate.end {
        conditions.push(doc! { "$lte": [field.as_str(), end] });
    }
    conditions
}

/// A full scan means more ids may follow the last one
fn continuation(scanned: u64, last: Bson, page_size: u32) -> Option<ContinuationToken> {
    (scanned >= u64::from(page_size)).then(|| ContinuationToken::new(last))
}
