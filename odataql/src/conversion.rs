use crate::ast::{Node, OrderByClause};
use crate::value::Value;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

impl From<i16> for Value {
    fn from(value: i16) -> Self { Value::I16(value) }
}
impl From<i32> for Value {
    fn from(value: i32) -> Self { Value::I32(value) }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self { Value::I64(value) }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self { Value::F64(value) }
}
impl From<bool> for Value {
    fn from(value: bool) -> Self { Value::Bool(value) }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self { Value::String(value.to_string()) }
}
impl From<String> for Value {
    fn from(value: String) -> Self { Value::String(value) }
}
impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self { Value::Guid(value) }
}
impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self { Value::DateTime(value) }
}
impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self { Value::DateTime(value.fixed_offset()) }
}
impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self { Value::Complex(value) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self { Value::Collection(value.into_iter().map(Into::into).collect()) }
}

impl From<Node> for OrderByClause {
    /// A single ascending term.
    fn from(expr: Node) -> Self { OrderByClause { terms: vec![crate::ast::OrderByTerm { expr, direction: Default::default() }] } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_and_vec() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
        assert_eq!(Value::from(vec![1i64, 2]), Value::Collection(vec![Value::I64(1), Value::I64(2)]));
    }
}
