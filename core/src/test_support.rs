use crate::queryable::Record;
use chrono::{FixedOffset, TimeZone};
use odataql::{Model, PrimitiveType, QueryContext, TypeRef, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Level;

#[ctor::ctor]
fn init_tracing() { tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_test_writer().init(); }

pub fn model() -> Arc<Model> {
    Model::builder()
        .entity("Sample.CustomerBase", |t| t.property("Id", PrimitiveType::Int32))
        .entity("Sample.Customer", |t| {
            t.derives_from("Sample.CustomerBase")
                .property("Name", PrimitiveType::String)
                .property("Nickname", PrimitiveType::String)
                .property("Address", TypeRef::structured("Sample.Address"))
                .property("Tags", TypeRef::collection(PrimitiveType::String))
                .property("Contacts", TypeRef::collection(TypeRef::structured("Sample.Customer")))
                .property("Birthday", PrimitiveType::DateTime)
                .property("AmountSpent", PrimitiveType::Double)
                .property("Rank", PrimitiveType::Int64)
        })
        .entity("Sample.VipCustomer", |t| t.derives_from("Sample.Customer").property("Level", PrimitiveType::Int16))
        .complex("Sample.Address", |t| {
            t.property("City", PrimitiveType::String).property("State", PrimitiveType::String).property("Zip", PrimitiveType::String)
        })
        .build_shared()
        .unwrap()
}

pub fn context() -> QueryContext { QueryContext::new(model(), "Sample.Customer").unwrap() }

/// A record with an explicit runtime type.
#[derive(Debug, Clone)]
pub struct Row {
    pub type_name: &'static str,
    pub values: BTreeMap<String, Value>,
}

impl Record for Row {
    fn value(&self, property: &str) -> Option<Value> { self.values.get(property).cloned() }

    fn type_name(&self) -> Option<&str> { Some(self.type_name) }
}

fn complex<const N: usize>(members: [(&str, Value); N]) -> Value {
    Value::Complex(members.into_iter().map(|(name, value)| (name.to_string(), value)).collect())
}

fn tags(tags: &[&str]) -> Value { Value::Collection(tags.iter().map(|t| Value::from(*t)).collect()) }

fn row(id: i32, name: &str, amount: f64, tag_list: &[&str]) -> Row {
    let values = [
        ("Id", Value::I32(id)),
        ("Name", Value::from(name)),
        ("AmountSpent", Value::F64(amount)),
        ("Tags", tags(tag_list)),
    ];
    Row { type_name: "Sample.Customer", values: values.into_iter().map(|(k, v)| (k.to_string(), v)).collect() }
}

/// Alice with two contacts, a missing nickname and an address in Redmond.
pub fn customer() -> Row {
    let mut customer = row(7, "Alice", 100.5, &["vip", "early"]);
    let birthday = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(1990, 4, 12, 8, 30, 0).unwrap();
    let contacts = vec![
        complex([("Name", Value::from("Bob")), ("Tags", tags(&["x"])), ("Contacts", Value::Collection(vec![]))]),
        complex([("Name", Value::from("Carol")), ("Tags", tags(&[]))]),
    ];
    customer.values.extend([
        ("Nickname".to_string(), Value::Null),
        ("Address".to_string(), complex([("City", Value::from("Redmond")), ("State", Value::from("WA"))])),
        ("Contacts".to_string(), Value::Collection(contacts)),
        ("Birthday".to_string(), Value::DateTime(birthday)),
        ("Rank".to_string(), Value::I64(3)),
    ]);
    customer
}

pub fn records() -> Vec<Row> {
    vec![
        row(1, "Alice", 120.0, &["vip"]),
        row(2, "Carol", 30.0, &["vip"]),
        row(3, "Bob", 80.0, &[]),
        row(4, "Alice", 75.5, &["vip", "early"]),
    ]
}
