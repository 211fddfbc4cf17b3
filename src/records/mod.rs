// Records module
// Row snapshots read from the relational source and their index-safe projections


use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};
use uuid::Uuid;

/// Index-safe key/value projection of a record, attached to a point
pub type Payload = serde_json::Map<String, Value>;

/// A single column value as read from the relational source
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    /// Arbitrary-precision numeric kept in its textual form
    Decimal(String),
    Json(Value),
    Bytes(Vec<u8>),
}

impl FieldValue {
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// JSON form of the value when it is already JSON-native, `None` otherwise
    #[inline]
    pub fn as_json(&self) -> Option<Value> {
        match self {
            Self::Null => Some(Value::Null),
            Self::Bool(value) => Some(Value::Bool(*value)),
            Self::Int(value) => Some(Value::Number((*value).into())),
            Self::Float(value) => Number::from_f64(*value).map(Value::Number),
            Self::Text(value) => Some(Value::String(value.clone())),
            Self::Json(value) => Some(value.clone()),
            Self::Uuid(_) | Self::Timestamp(_) | Self::Decimal(_) | Self::Bytes(_) => None,
        }
    }

    /// Payload form: the JSON-native value when there is one, the string form otherwise
    #[inline]
    pub fn to_payload_value(&self) -> Value {
        self.as_json()
            .unwrap_or_else(|| Value::String(self.to_string()))
    }
}

impl fmt::Display for FieldValue {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::Text(value) | Self::Decimal(value) => f.write_str(value),
            Self::Uuid(value) => write!(f, "{}", value.hyphenated()),
            Self::Timestamp(value) => {
                f.write_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
            Self::Json(value) => write!(f, "{}", value),
            Self::Bytes(bytes) => {
                f.write_str("\\x")?;
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for FieldValue {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    #[inline]
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Uuid> for FieldValue {
    #[inline]
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    #[inline]
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Value> for FieldValue {
    #[inline]
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            other => Self::Json(other),
        }
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    #[inline]
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One row of a source table: column name -> value, in column order.
///
/// Records are read-only snapshots; nothing in the sync path mutates them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. A repeated column name replaces the earlier value in place.
    #[inline]
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    #[inline]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value);
        self
    }

    #[inline]
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[inline]
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    #[inline]
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

/// Project a record into an index-safe payload.
///
/// Keys are exactly the record's column names. JSON-native values are kept as-is
/// and anything else falls back to its string form, so this never fails.
#[inline]
pub fn to_payload(record: &Record) -> Payload {
    record
        .iter()
        .map(|(column, value)| (column.to_string(), value.to_payload_value()))
        .collect()
}

/// Build the text fed to the embedder: `"field: value"` pieces joined by a single
/// space, in record column order. Null fields are skipped; when `text_fields` is
/// given only those columns contribute.
#[inline]
pub fn embedding_text(record: &Record, text_fields: Option<&HashSet<String>>) -> String {
    let parts: Vec<String> = record
        .iter()
        .filter(|(_, value)| !value.is_null())
        .filter(|(column, _)| text_fields.is_none_or(|fields| fields.contains(*column)))
        .map(|(column, value)| format!("{}: {}", column, value))
        .collect();

    parts.join(" ")
}
