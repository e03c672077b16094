//! Conversions between Rust field types and [`Value`]s.

use crate::models::{Kind, Value};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A Rust type that can be stored in a bound column.
///
/// `from_value` hands the value back on mismatch so the caller can report what
/// the row actually contained.
pub trait ColumnType: Send + Sync + 'static {
    /// Logical type, used to bind typed NULLs.
    const KIND: Kind;

    /// Optional columns are left out of INSERT when empty, regardless of flags.
    const OPTIONAL: bool = false;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, Value>
    where
        Self: Sized;

    /// Whether this is the "empty" value for its type.
    fn is_empty(&self) -> bool;
}

impl ColumnType for i64 {
    const KIND: Kind = Kind::Int;

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(v) => Ok(v),
            other => Err(other),
        }
    }

    fn is_empty(&self) -> bool {
        *self == 0
    }
}

macro_rules! impl_narrow_int {
    ($($ty:ty),+) => {
        $(
            impl ColumnType for $ty {
                const KIND: Kind = Kind::Int;

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, Value> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(v).map_err(|_| Value::Int(v)),
                        other => Err(other),
                    }
                }

                fn is_empty(&self) -> bool {
                    *self == 0
                }
            }
        )+
    };
}

impl_narrow_int!(i16, i32);

impl ColumnType for f64 {
    const KIND: Kind = Kind::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(other),
        }
    }

    fn is_empty(&self) -> bool {
        *self == 0.0
    }
}

impl ColumnType for f32 {
    const KIND: Kind = Kind::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(v) => Ok(v as f32),
            Value::Int(v) => Ok(v as f32),
            other => Err(other),
        }
    }

    fn is_empty(&self) -> bool {
        *self == 0.0
    }
}

impl ColumnType for bool {
    const KIND: Kind = Kind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(other),
        }
    }

    // false is a real value, never "empty"
    fn is_empty(&self) -> bool {
        false
    }
}

impl ColumnType for String {
    const KIND: Kind = Kind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(other),
        }
    }

    fn is_empty(&self) -> bool {
        String::is_empty(self)
    }
}

impl ColumnType for Vec<u8> {
    const KIND: Kind = Kind::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bytes(v) => Ok(v),
            other => Err(other),
        }
    }

    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

impl ColumnType for JsonValue {
    const KIND: Kind = Kind::Json;

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Null(_) => Ok(JsonValue::Null),
            other => Err(other),
        }
    }

    fn is_empty(&self) -> bool {
        self.is_null()
    }
}

impl ColumnType for DateTime<Utc> {
    const KIND: Kind = Kind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Timestamp(v) => Ok(v),
            other => Err(other),
        }
    }

    /// The default (Unix epoch) timestamp counts as unset.
    fn is_empty(&self) -> bool {
        *self == DateTime::<Utc>::default()
    }
}

impl ColumnType for Uuid {
    const KIND: Kind = Kind::Uuid;

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Uuid(v) => Ok(v),
            other => Err(other),
        }
    }

    fn is_empty(&self) -> bool {
        self.is_nil()
    }
}

impl<T: ColumnType> ColumnType for Option<T> {
    const KIND: Kind = T::KIND;
    const OPTIONAL: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null(T::KIND),
        }
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null(_) => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn is_empty(&self) -> bool {
        self.is_none()
    }
}
