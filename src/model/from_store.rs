use std::str::FromStr;

use bigdecimal::BigDecimal;
use bson::{Bson, Document};

use super::{AttributeMap, AttributeValue};

impl From<Bson> for AttributeValue {
    fn from(value: Bson) -> Self {
        match value {
            Bson::Null | Bson::Undefined => AttributeValue::Null,
            Bson::Boolean(b) => AttributeValue::Bool(b),
            Bson::Int32(n) => AttributeValue::Number(BigDecimal::from(n)),
            Bson::Int64(n) => AttributeValue::Number(BigDecimal::from(n)),
            Bson::Double(f) => double_to_value(f),
            Bson::Decimal128(d) => {
                let text = d.to_string();
                AttributeValue::number(&text).unwrap_or(AttributeValue::String(text))
            }
            Bson::String(s) => AttributeValue::String(s),
            Bson::Array(items) => {
                AttributeValue::List(items.into_iter().map(AttributeValue::from).collect())
            }
            Bson::Document(doc) => AttributeValue::Map(AttributeMap::from(doc)),
            Bson::ObjectId(oid) => AttributeValue::String(oid.to_hex()),
            Bson::DateTime(dt) => AttributeValue::String(
                dt.try_to_rfc3339_string()
                    .unwrap_or_else(|_| dt.timestamp_millis().to_string()),
            ),
            Bson::Binary(bin) => AttributeValue::String(hex::encode(&bin.bytes)),
            Bson::RegularExpression(regex) => {
                AttributeValue::String(format!("/{}/{}", regex.pattern, regex.options))
            }
            Bson::Timestamp(ts) => {
                AttributeValue::String(format!("Timestamp({}, {})", ts.time, ts.increment))
            }
            Bson::Symbol(s) => AttributeValue::String(s),
            Bson::JavaScriptCode(code) => AttributeValue::String(code),
            Bson::MinKey => AttributeValue::String("MinKey".to_string()),
            Bson::MaxKey => AttributeValue::String("MaxKey".to_string()),
            other => AttributeValue::String(other.to_string()),
        }
    }
}

impl From<Document> for AttributeMap {
    fn from(doc: Document) -> Self {
        doc.into_iter()
            .map(|(k, v)| (k, AttributeValue::from(v)))
            .collect()
    }
}

/// Doubles go through their shortest round-trip text so `0.1` stays `0.1`
/// instead of the exact binary expansion.
fn double_to_value(f: f64) -> AttributeValue {
    if !f.is_finite() {
        return AttributeValue::String(f.to_string());
    }
    BigDecimal::from_str(&f.to_string())
        .map(AttributeValue::Number)
        .unwrap_or_else(|_| AttributeValue::String(f.to_string()))
}
