//! Driver-neutral column and argument values.
//!
//! `Value` is what flows between records and the driver: statement arguments are
//! built from record fields, and result rows are decoded into values before being
//! hydrated back into records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// Logical type of a value. Carried by NULLs so drivers can bind typed nulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    #[default]
    Unknown,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Json,
    Timestamp,
    Uuid,
}

/// A single column or argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL, tagged with the type it stands in for
    Null(Kind),
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(JsonValue),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    /// A column the driver cannot decode, carrying its database type name.
    /// Harmless unless a bound field tries to store it.
    Unsupported(String),
}

impl Value {
    /// Untyped NULL.
    pub const NULL: Value = Value::Null(Kind::Unknown);

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Self::Null(kind) => *kind,
            Self::Bool(_) => Kind::Bool,
            Self::Int(_) => Kind::Int,
            Self::Float(_) => Kind::Float,
            Self::Text(_) => Kind::Text,
            Self::Bytes(_) => Kind::Bytes,
            Self::Json(_) => Kind::Json,
            Self::Timestamp(_) => Kind::Timestamp,
            Self::Uuid(_) => Kind::Uuid,
            Self::Unsupported(_) => Kind::Unknown,
        }
    }

    /// Get the type name of this value for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null(_) => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
            Self::Timestamp(_) => "timestamp",
            Self::Uuid(_) => "uuid",
            Self::Unsupported(_) => "unsupported",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Renders the value the way it is shown in trace logs.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(_) => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => {
                use base64::{Engine as _, engine::general_purpose::STANDARD};
                write!(f, "b64:{}", STANDARD.encode(v))
            }
            Self::Json(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{:?}", v.to_rfc3339()),
            Self::Uuid(v) => write!(f, "{:?}", v.to_string()),
            Self::Unsupported(type_name) => write!(f, "<{type_name}>"),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => |$v:ident| $body:expr),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )+
    };
}

impl_from_value! {
    bool => |v| Value::Bool(v),
    i16 => |v| Value::Int(v.into()),
    i32 => |v| Value::Int(v.into()),
    i64 => |v| Value::Int(v),
    f32 => |v| Value::Float(v.into()),
    f64 => |v| Value::Float(v),
    String => |v| Value::Text(v),
    &str => |v| Value::Text(v.to_string()),
    Vec<u8> => |v| Value::Bytes(v),
    JsonValue => |v| Value::Json(v),
    DateTime<Utc> => |v| Value::Timestamp(v),
    Uuid => |v| Value::Uuid(v),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::NULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_of_values() {
        assert_eq!(Value::from(3i32).kind(), Kind::Int);
        assert_eq!(Value::from("a").kind(), Kind::Text);
        assert_eq!(Value::Null(Kind::Timestamp).kind(), Kind::Timestamp);
        assert!(Value::from(None::<i64>).is_null());
    }

    #[test]
    fn test_display_for_trace() {
        assert_eq!(Value::from("a").to_string(), "\"a\"");
        assert_eq!(Value::from(42i64).to_string(), "42");
        assert_eq!(Value::NULL.to_string(), "NULL");
        assert_eq!(Value::Bytes(b"hi".to_vec()).to_string(), "b64:aGk=");
    }
}
