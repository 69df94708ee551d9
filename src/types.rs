use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;

/// Values that can be bound as statement parameters or read back from a row.
///
/// One enum covers both directions so callers never touch driver types:
/// ```rust
/// use sqlite_queue::prelude::*;
///
/// let params = vec![
///     SqlValue::Int(1),
///     SqlValue::Text("alice".into()),
///     SqlValue::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl SqlValue {
    /// True for the SQL NULL value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// SQLite stores booleans as integers; `0` and `1` read back as booleans.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            _ => None,
        }
    }

    /// Timestamps round-trip through TEXT columns as `%F %T%.f`; a bare
    /// `%F` date reads back as midnight.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(dt) => Some(*dt),
            Self::Text(s) => NaiveDateTime::parse_from_str(s, "%F %T%.f").ok().or_else(|| {
                NaiveDate::parse_from_str(s, "%F")
                    .ok()
                    .map(|date| date.and_time(NaiveTime::MIN))
            }),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Convert into the driver's value type for binding.
    #[must_use]
    pub(crate) fn to_sqlite(&self) -> rusqlite::types::Value {
        match self {
            SqlValue::Int(i) => rusqlite::types::Value::Integer(*i),
            SqlValue::Float(f) => rusqlite::types::Value::Real(*f),
            SqlValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
            SqlValue::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
            SqlValue::Timestamp(dt) => {
                rusqlite::types::Value::Text(dt.format("%F %T%.f").to_string())
            }
            SqlValue::Null => rusqlite::types::Value::Null,
            SqlValue::Json(jval) => rusqlite::types::Value::Text(jval.to_string()),
            SqlValue::Blob(bytes) => rusqlite::types::Value::Blob(bytes.clone()),
        }
    }

    /// Convert a driver value read from a row.
    #[must_use]
    pub(crate) fn from_sqlite(value: rusqlite::types::Value) -> Self {
        match value {
            rusqlite::types::Value::Null => SqlValue::Null,
            rusqlite::types::Value::Integer(i) => SqlValue::Int(i),
            rusqlite::types::Value::Real(f) => SqlValue::Float(f),
            rusqlite::types::Value::Text(s) => SqlValue::Text(s),
            rusqlite::types::Value::Blob(b) => SqlValue::Blob(b),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<JsonValue> for SqlValue {
    fn from(value: JsonValue) -> Self {
        SqlValue::Json(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

/// A statement and its ordered parameters bundled together.
///
/// The builder's `finalize` emits these; `submit_raw` accepts the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAndParams {
    /// The SQL text
    pub query: String,
    /// The parameters to be bound, in placeholder order
    pub params: Vec<SqlValue>,
}

impl QueryAndParams {
    /// Create a new `QueryAndParams` with the given statement and parameters.
    pub fn new(query: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    /// Create a new `QueryAndParams` with no parameters.
    pub fn new_without_params(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }
}
