//! Row and attribute value model
//!
//! Rows fetched from the store are schema-less: every row is an ordered map
//! from attribute name to [`AttributeValue`], and no attribute is guaranteed
//! to exist in every row.

mod from_store;

use bigdecimal::BigDecimal;

/// A single value as stored in a row
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Explicit null
    Null,
    /// Boolean flag
    Bool(bool),
    /// Arbitrary precision number
    Number(BigDecimal),
    /// Text
    String(String),
    /// Ordered list of values
    List(Vec<AttributeValue>),
    /// Nested map of values
    Map(AttributeMap),
}

/// Insertion-ordered map of attribute name to value
///
/// Lookups are linear; rows are narrow enough that this beats hashing and it
/// keeps the order in which the store returned the attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap {
    entries: Vec<(String, AttributeValue)>,
}

/// A single record fetched from the store
pub type Row = AttributeMap;

/// All rows of one pipeline run, in fetch order until sorted
pub type RowSet = Vec<Row>;

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value under the same name in place
    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, AttributeValue)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, AttributeValue)>>(iter: I) -> Self {
        let mut map = AttributeMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Number(BigDecimal::from(n))
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl AttributeValue {
    /// Build a number from its decimal text, e.g. `"10.50"`
    ///
    /// Returns `None` when the text is not a finite decimal.
    pub fn number(text: &str) -> Option<Self> {
        text.trim()
            .parse::<BigDecimal>()
            .ok()
            .map(AttributeValue::Number)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}
