#![allow(unused)]

use odataql::{Model, PrimitiveType, QueryContext, TypeRef, Value};
use odataql_core::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init(); }

pub fn sample_model() -> Arc<Model> {
    Model::builder()
        .entity("Sample.CustomerBase", |t| t.property("Id", PrimitiveType::Int32))
        .entity("Sample.Customer", |t| {
            t.derives_from("Sample.CustomerBase")
                .property("Name", PrimitiveType::String)
                .property("Nickname", PrimitiveType::String)
                .property("Address", TypeRef::structured("Sample.Address"))
                .property("Tags", TypeRef::collection(PrimitiveType::String))
                .property("Contacts", TypeRef::collection(TypeRef::structured("Sample.Customer")))
                .property("AmountSpent", PrimitiveType::Double)
                .property("Rank", PrimitiveType::Int64)
        })
        .entity("Sample.VipCustomer", |t| t.derives_from("Sample.Customer").property("Level", PrimitiveType::Int16))
        .complex("Sample.Address", |t| t.property("City", PrimitiveType::String).property("State", PrimitiveType::String))
        .build_shared()
        .expect("sample model")
}

pub fn customer_context() -> QueryContext { QueryContext::new(sample_model(), "Sample.Customer").expect("element type") }

/// A customer row. Customers with a `level` are `Sample.VipCustomer`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub amount_spent: f64,
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub level: Option<i16>,
}

impl Record for Customer {
    fn value(&self, property: &str) -> Option<Value> {
        Some(match property {
            "Id" => self.id.into(),
            "Name" => self.name.clone().into(),
            "Nickname" => self.nickname.clone().into(),
            "Address" => match &self.city {
                Some(city) => BTreeMap::from([("City".to_string(), Value::from(city.clone()))]).into(),
                None => Value::Null,
            },
            "Tags" => self.tags.clone().into(),
            "AmountSpent" => self.amount_spent.into(),
            "Rank" => self.rank.into(),
            "Level" => self.level.into(),
            _ => return None,
        })
    }

    fn type_name(&self) -> Option<&str> { Some(if self.level.is_some() { "Sample.VipCustomer" } else { "Sample.Customer" }) }
}

pub fn customer(id: i32, name: &str, amount_spent: f64) -> Customer {
    Customer { id, name: name.to_string(), nickname: None, city: None, tags: vec![], amount_spent, rank: 0, level: None }
}

pub fn ids(customers: &[Customer]) -> Vec<i32> { customers.iter().map(|c| c.id).collect() }
