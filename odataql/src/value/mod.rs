mod cast;

pub use cast::CastError;

use crate::schema::PrimitiveType;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Display;
use uuid::Uuid;

/// A dynamically typed value: literal constants in the AST, and property values read from records.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Value {
    Null,

    // Numbers
    I16(i16),
    I32(i32),
    I64(i64),
    F64(f64),

    Bool(bool),
    String(String),
    Guid(Uuid),
    DateTime(DateTime<FixedOffset>),

    Collection(Vec<Value>),
    /// Values of a complex or navigated entity, keyed by property name
    Complex(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    /// The primitive type of a scalar value. Null, collections and complex values have none.
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        Some(match self {
            Value::I16(_) => PrimitiveType::Int16,
            Value::I32(_) => PrimitiveType::Int32,
            Value::I64(_) => PrimitiveType::Int64,
            Value::F64(_) => PrimitiveType::Double,
            Value::Bool(_) => PrimitiveType::Boolean,
            Value::String(_) => PrimitiveType::String,
            Value::Guid(_) => PrimitiveType::Guid,
            Value::DateTime(_) => PrimitiveType::DateTime,
            Value::Null | Value::Collection(_) | Value::Complex(_) => return None,
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I16(n) => Some(*n as i64),
            Value::I32(n) => Some(*n as i64),
            Value::I64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(n) => Some(*n),
            other => other.as_i64().map(|n| n as f64),
        }
    }

    /// Member of a complex value, `None` if this is not a complex value or the member is absent.
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Complex(members) => members.get(name),
            _ => None,
        }
    }

    /// Orders two non-null scalars. Integers of different widths compare by value, and an integer
    /// compared with a double compares as a double. Returns `None` for nulls, mismatched kinds, and NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::F64(_), _) | (_, Value::F64(_)) => self.as_f64()?.partial_cmp(&other.as_f64()?),
            (a, b) if a.as_i64().is_some() => Some(a.as_i64()?.cmp(&b.as_i64()?)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality with numeric widening; null equals only null.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => self.compare(other) == Some(Ordering::Equal) || (self.compare(other).is_none() && self == other),
        }
    }

    /// Total order used for sorting: nulls first, then [`Value::compare`], falling back to equal.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::I16(n) => write!(f, "{}", n),
            Value::I32(n) => write!(f, "{}", n),
            Value::I64(n) => write!(f, "{}L", n),
            Value::F64(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Guid(g) => write!(f, "guid'{}'", g),
            Value::DateTime(dt) => write!(f, "datetime'{}'", dt.to_rfc3339()),
            Value::Collection(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Complex(members) => {
                write!(f, "{{")?;
                for (i, (name, value)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
