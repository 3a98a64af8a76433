//! Dynamically typed SQL values.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::types::SqlType;

/// Text format used to store and render timestamps.
///
/// Matches what `CURRENT_TIMESTAMP` produces in SQLite; fractional seconds are
/// written only when present.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A single SQL value, as bound to a statement or read from a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    BigInt(i64),
    /// Double-precision float.
    Double(f64),
    /// Text.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Date and time without zone.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Whether this is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::BigInt(_) => "INTEGER",
            Value::Double(_) => "DOUBLE",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
            Value::Timestamp(_) => "TIMESTAMP",
        }
    }

    /// Integer view, if this value holds an integer or a boolean.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::BigInt(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view, if this value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::BigInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Text view, if this value holds text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view; integers are read as `!= 0`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::BigInt(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Render this value as JSON.
    ///
    /// Timestamps become strings in [`TIMESTAMP_FORMAT`]; bytes become an
    /// array of numbers.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::BigInt(v) => JsonValue::from(*v),
            Value::Double(v) => JsonValue::from(*v),
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Bytes(b) => JsonValue::from(b.clone()),
            Value::Timestamp(ts) => JsonValue::String(ts.format(TIMESTAMP_FORMAT).to_string()),
        }
    }

    /// Convert JSON input into a value of column type `sql_type`.
    ///
    /// Numeric strings are accepted for numeric columns, so form-style input
    /// such as `"1998"` lands as an integer.
    pub fn from_json(json: &JsonValue, sql_type: SqlType) -> Result<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = || Error::Conversion {
            column: None,
            message: format!("cannot convert {json} to {sql_type:?}"),
        };
        match sql_type {
            SqlType::Integer => match json {
                JsonValue::Number(n) => n.as_i64().map(Value::BigInt).ok_or_else(mismatch),
                JsonValue::String(s) => s.trim().parse().map(Value::BigInt).map_err(|_| mismatch()),
                JsonValue::Bool(b) => Ok(Value::BigInt(i64::from(*b))),
                _ => Err(mismatch()),
            },
            SqlType::Double => match json {
                JsonValue::Number(n) => n.as_f64().map(Value::Double).ok_or_else(mismatch),
                JsonValue::String(s) => s.trim().parse().map(Value::Double).map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            SqlType::Boolean => match json {
                JsonValue::Bool(b) => Ok(Value::Bool(*b)),
                JsonValue::Number(n) => n.as_i64().map(|v| Value::Bool(v != 0)).ok_or_else(mismatch),
                JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" | "yes" => Ok(Value::Bool(true)),
                    "false" | "f" | "0" | "no" => Ok(Value::Bool(false)),
                    _ => Err(mismatch()),
                },
                _ => Err(mismatch()),
            },
            SqlType::Text => match json {
                JsonValue::String(s) => Ok(Value::Text(s.clone())),
                _ => Err(mismatch()),
            },
            SqlType::Blob => match json {
                JsonValue::String(s) => Ok(Value::Bytes(s.as_bytes().to_vec())),
                JsonValue::Array(items) => items
                    .iter()
                    .map(|i| {
                        i.as_u64()
                            .and_then(|b| u8::try_from(b).ok())
                            .ok_or_else(mismatch)
                    })
                    .collect::<Result<Vec<u8>>>()
                    .map(Value::Bytes),
                _ => Err(mismatch()),
            },
            SqlType::Timestamp => match json {
                JsonValue::String(s) => parse_timestamp(s).map(Value::Timestamp).ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
        }
    }
}

/// Parse a timestamp in any of the text forms drivers commonly return.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

macro_rules! impl_from_for_value {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => |v| Value::Bool(v),
    i64 => |v| Value::BigInt(v),
    i32 => |v| Value::BigInt(i64::from(v)),
    i16 => |v| Value::BigInt(i64::from(v)),
    f64 => |v| Value::Double(v),
    f32 => |v| Value::Double(f64::from(v)),
    String => |v| Value::Text(v),
    Vec<u8> => |v| Value::Bytes(v),
    NaiveDateTime => |v| Value::Timestamp(v),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a [`Value`] read out of a row.
pub trait FromValue: Sized {
    /// Convert, failing when the value does not fit the target type.
    fn from_value(value: Value) -> Result<Self>;
}

fn conversion_err<T>(value: &Value, target: &str) -> Result<T> {
    Err(Error::Conversion {
        column: None,
        message: format!("expected {target}, found {}", value.type_name()),
    })
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::BigInt(v) => Ok(*v),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Text(s) => s.trim().parse().or_else(|_| conversion_err(&value, "integer")),
            _ => conversion_err(&value, "integer"),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| Error::Conversion {
            column: None,
            message: format!("{wide} does not fit in i32"),
        })
    }
}

impl FromValue for i16 {
    fn from_value(value: Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        i16::try_from(wide).map_err(|_| Error::Conversion {
            column: None,
            message: format!("{wide} does not fit in i16"),
        })
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        value
            .as_f64()
            .map_or_else(|| conversion_err(&value, "float"), Ok)
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        value
            .as_bool()
            .map_or_else(|| conversion_err(&value, "boolean"), Ok)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => conversion_err(&other, "text"),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => conversion_err(&other, "blob"),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Timestamp(ts) => Ok(*ts),
            Value::Text(s) => parse_timestamp(s).map_or_else(|| conversion_err(&value, "timestamp"), Ok),
            _ => conversion_err(&value, "timestamp"),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
