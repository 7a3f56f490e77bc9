//! Ordering rows by an attribute of unknown type
//!
//! The sort attribute may hold a number in one row, a date string in the
//! next and be absent in a third. Every value is mapped to a [`SortKey`]
//! whose rank (numeric, textual, missing) is compared first, so any mix of
//! types still has a total order.
//!
//! Descending order reverses the whole comparator, rank included: missing
//! values come last when ascending and first when descending.

use std::cmp::Ordering;

use bigdecimal::ToPrimitive;
use tracing::{debug, trace};

use crate::coerce::to_compact_json;
use crate::model::{AttributeValue, Row};
use crate::utils::time::{epoch_seconds, parse_datetime};

/// Coarse type class of a sort key, compared before the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortRank {
    Numeric = 0,
    Textual = 1,
    Missing = 2,
}

/// Transient ordering key for one row
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Numeric(f64),
    Textual(String),
    Missing,
}

/// Requested sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortKey {
    pub fn rank(&self) -> SortRank {
        match self {
            SortKey::Numeric(_) => SortRank::Numeric,
            SortKey::Textual(_) => SortRank::Textual,
            SortKey::Missing => SortRank::Missing,
        }
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Numeric(a), SortKey::Numeric(b)) => a.total_cmp(b),
            (SortKey::Textual(a), SortKey::Textual(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Derive the sort key of a value; `None` means the attribute is absent
///
/// First match wins:
/// 1. absent or null: missing
/// 2. number: numeric
/// 3. string: a date becomes its epoch seconds, a decimal its value,
///    anything else stays text
/// 4. other values: their text
///
/// Never fails; a string that does not parse falls through to the next kind.
pub fn sort_key(value: Option<&AttributeValue>, attr: &str) -> SortKey {
    let key = match value {
        None | Some(AttributeValue::Null) => SortKey::Missing,
        Some(AttributeValue::Number(n)) => SortKey::Numeric(n.to_f64().unwrap_or(f64::NAN)),
        Some(AttributeValue::String(s)) => string_key(s),
        Some(AttributeValue::Bool(b)) => SortKey::Textual(b.to_string()),
        Some(other @ (AttributeValue::List(_) | AttributeValue::Map(_))) => {
            SortKey::Textual(to_compact_json(other))
        }
    };
    trace!(attr, ?key, "derived sort key");
    key
}

fn string_key(s: &str) -> SortKey {
    if let Some(dt) = parse_datetime(s) {
        return SortKey::Numeric(epoch_seconds(&dt));
    }
    if let Some(n) = AttributeValue::number(s).and_then(|v| match v {
        AttributeValue::Number(n) => n.to_f64(),
        _ => None,
    }) {
        return SortKey::Numeric(n);
    }
    SortKey::Textual(s.to_string())
}

/// Sort rows in place by one attribute
///
/// The sort is stable: rows with equal keys keep their relative order in
/// either direction.
pub fn sort_rows(rows: &mut [Row], attr: &str, direction: SortDirection) {
    debug!(
        "Sorting {} rows by '{}' ({:?})",
        rows.len(),
        attr,
        direction
    );

    let mut keyed: Vec<(SortKey, Row)> = rows
        .iter_mut()
        .map(|row| (sort_key(row.get(attr), attr), std::mem::take(row)))
        .collect();

    match direction {
        SortDirection::Ascending => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
        SortDirection::Descending => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
    }

    for (slot, (_, row)) in rows.iter_mut().zip(keyed) {
        *slot = row;
    }
}
