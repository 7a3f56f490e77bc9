//! Scalar coercion for tabular and JSON output
//!
//! This module turns store values into forms that serialize and compare
//! predictably:
//! - [`CellConverter`]: one flat cell per value, for CSV
//! - [`JsonView`] / [`JsonRecord`]: native JSON nesting, for whole records
//!
//! # Design
//!
//! Converters share the [`ValueConverter`] trait so a writer can take any
//! strategy. Coercion is total: every [`AttributeValue`] has an output.

use std::fmt;

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::model::{AttributeMap, AttributeValue};

/// Canonical scalar produced for a single output cell
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    /// Compact JSON text of a list or map
    SerializedJson(String),
}

impl Default for ScalarValue {
    fn default() -> Self {
        ScalarValue::String(String::new())
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer(n) => write!(f, "{n}"),
            ScalarValue::Float(x) => write!(f, "{x}"),
            ScalarValue::Boolean(b) => write!(f, "{b}"),
            ScalarValue::String(s) | ScalarValue::SerializedJson(s) => f.write_str(s),
        }
    }
}

/// Core trait for value conversion
///
/// This trait allows different conversion strategies to be implemented
/// for various output formats.
pub trait ValueConverter {
    /// Output type of the conversion
    type Output;

    /// Convert a present value
    fn convert(&self, value: &AttributeValue) -> Self::Output;

    /// Convert a value that may be absent from the row
    fn convert_optional(&self, value: Option<&AttributeValue>) -> Self::Output
    where
        Self::Output: Default,
    {
        value.map(|v| self.convert(v)).unwrap_or_default()
    }
}

/// Coerce a number: integral values become integers, the rest floats.
///
/// Integrality is decided on the decimal itself, so `10.0` stored as a
/// decimal is the integer `10`. Integral values outside the `i64` range
/// fall back to a float.
pub fn coerce_number(value: &BigDecimal) -> ScalarValue {
    if value.is_integer() {
        if let Some(n) = value.to_i64() {
            return ScalarValue::Integer(n);
        }
    }
    ScalarValue::Float(value.to_f64().unwrap_or(f64::NAN))
}

/// Converter producing one flat cell per value
///
/// Used by the CSV writer. Nulls become empty cells and nested structures
/// become compact JSON so they cannot break the delimiter layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct CellConverter;

impl CellConverter {
    pub fn new() -> Self {
        Self
    }

    /// Text of a cell, as written to the output
    pub fn cell_text(&self, value: Option<&AttributeValue>) -> String {
        self.convert_optional(value).to_string()
    }
}

impl ValueConverter for CellConverter {
    type Output = ScalarValue;

    fn convert(&self, value: &AttributeValue) -> ScalarValue {
        match value {
            AttributeValue::Null => ScalarValue::default(),
            AttributeValue::Bool(b) => ScalarValue::Boolean(*b),
            AttributeValue::Number(n) => coerce_number(n),
            AttributeValue::String(s) => ScalarValue::String(s.clone()),
            AttributeValue::List(_) | AttributeValue::Map(_) => {
                ScalarValue::SerializedJson(to_compact_json(value))
            }
        }
    }
}

/// Render a value as compact JSON text, keeping map insertion order
pub fn to_compact_json(value: &AttributeValue) -> String {
    // Serializing the view cannot fail: keys are strings and floats are
    // written as null when non-finite.
    serde_json::to_string(&JsonView(value)).unwrap_or_default()
}

/// Serializable view of a value with native JSON nesting
///
/// Leaves are coerced individually; lists and maps stay structured.
pub struct JsonView<'a>(pub &'a AttributeValue);

impl Serialize for JsonView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            AttributeValue::Null => serializer.serialize_unit(),
            AttributeValue::Bool(b) => serializer.serialize_bool(*b),
            AttributeValue::Number(n) => match coerce_number(n) {
                ScalarValue::Integer(i) => serializer.serialize_i64(i),
                ScalarValue::Float(x) if x.is_finite() => serializer.serialize_f64(x),
                _ => serializer.serialize_unit(),
            },
            AttributeValue::String(s) => serializer.serialize_str(s),
            AttributeValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&JsonView(item))?;
                }
                seq.end()
            }
            AttributeValue::Map(map) => JsonRecord(map).serialize(serializer),
        }
    }
}

/// Serializable view of a whole record, in the record's own key order
pub struct JsonRecord<'a>(pub &'a AttributeMap);

impl Serialize for JsonRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0.iter() {
            map.serialize_entry(key, &JsonView(value))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;

    fn num(text: &str) -> AttributeValue {
        AttributeValue::number(text).unwrap()
    }

    #[test]
    fn test_integral_decimal_is_integer() {
        let converter = CellConverter::new();
        assert_eq!(converter.convert(&num("10.0")), ScalarValue::Integer(10));
        assert_eq!(converter.convert(&num("-3")), ScalarValue::Integer(-3));
        assert_eq!(converter.cell_text(Some(&num("10.00"))), "10");
    }

    #[test]
    fn test_fractional_decimal_is_float() {
        let converter = CellConverter::new();
        assert_eq!(converter.convert(&num("10.5")), ScalarValue::Float(10.5));
        assert_eq!(converter.cell_text(Some(&num("0.25"))), "0.25");
    }

    #[test]
    fn test_huge_integral_falls_back_to_float() {
        let converter = CellConverter::new();
        match converter.convert(&num("123456789012345678901234567890")) {
            ScalarValue::Float(x) => assert!(x > 1e29),
            other => panic!("unexpected scalar: {other:?}"),
        }
    }

    #[test]
    fn test_null_and_missing_are_empty_cells() {
        let converter = CellConverter::new();
        assert_eq!(converter.cell_text(Some(&AttributeValue::Null)), "");
        assert_eq!(converter.cell_text(None), "");
    }

    #[test]
    fn test_nested_values_become_compact_json() {
        let mut inner = Row::new();
        inner.insert("z", num("1"));
        inner.insert("a", AttributeValue::from("x"));
        let value = AttributeValue::List(vec![AttributeValue::Map(inner), AttributeValue::Null]);

        let converter = CellConverter::new();
        assert_eq!(
            converter.convert(&value),
            ScalarValue::SerializedJson(r#"[{"z":1,"a":"x"},null]"#.to_string())
        );
    }

    #[test]
    fn test_json_record_keeps_insertion_order() {
        let mut row = Row::new();
        row.insert("name", AttributeValue::from("Zoë"));
        row.insert("amount", num("12.50"));
        row.insert("count", num("3.0"));
        row.insert("gone", AttributeValue::Null);

        let json = serde_json::to_string(&JsonRecord(&row)).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Zoë","amount":12.5,"count":3,"gone":null}"#
        );
    }
}
