//! Column selection over schema-less rows
//!
//! Two orders are in play: the full export uses the lexicographic union of
//! every row's attributes, while a caller-supplied column list keeps the
//! caller's order.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::{ProjectionError, Result};
use crate::model::{AttributeMap, Row};

/// Ordered list of column names
pub type ColumnSet = Vec<String>;

/// Every attribute name present in any row, sorted lexicographically
pub fn union_columns(rows: &[Row]) -> ColumnSet {
    rows.iter()
        .flat_map(|row| row.keys())
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Normalize a user-supplied column list
///
/// Accepts discrete names, comma-joined names or a mix of both. Names are
/// trimmed, empty names dropped and duplicates removed keeping the first
/// occurrence.
pub fn normalize_columns<S: AsRef<str>>(raw: &[S]) -> ColumnSet {
    let mut seen = BTreeSet::new();
    raw.iter()
        .flat_map(|token| token.as_ref().split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

/// Resolve the columns to keep against the columns that actually exist
///
/// # Arguments
/// * `available` - Columns present in the data
/// * `wanted` - Requested columns, in output order
/// * `ignore_missing` - Drop absent columns with a warning instead of failing
///
/// # Returns
/// * `Result<ColumnSet>` - Requested columns that exist, in caller order
pub fn resolve_columns<S: AsRef<str>>(
    available: &[S],
    wanted: &[String],
    ignore_missing: bool,
) -> Result<ColumnSet> {
    let available: BTreeSet<&str> = available.iter().map(AsRef::as_ref).collect();
    let (present, missing): (Vec<&String>, Vec<&String>) = wanted
        .iter()
        .partition(|name| available.contains(name.as_str()));

    if !missing.is_empty() {
        let missing: Vec<String> = missing.into_iter().cloned().collect();
        if !ignore_missing {
            return Err(ProjectionError::SchemaMismatch { missing }.into());
        }
        warn!(
            "Ignoring requested columns that do not exist: {}",
            missing.join(", ")
        );
    }

    if present.is_empty() {
        return Err(ProjectionError::NoColumnsRemaining.into());
    }

    Ok(present.into_iter().cloned().collect())
}

/// Restrict rows to the requested columns
///
/// Returns the working column list together with the projected rows. Each
/// projected row holds the kept columns in caller order; a column absent
/// from an individual row stays absent.
pub fn project(rows: &[Row], wanted: &[String], ignore_missing: bool) -> Result<(ColumnSet, Vec<Row>)> {
    let columns = resolve_columns(&union_columns(rows), wanted, ignore_missing)?;

    let projected = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .filter_map(|name| row.get(name).map(|v| (name.clone(), v.clone())))
                .collect::<AttributeMap>()
        })
        .collect();

    Ok((columns, projected))
}
