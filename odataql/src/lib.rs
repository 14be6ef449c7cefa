//! OData query language: schema-bound parsing of `$filter` and `$orderby` expressions.
//!
//! ```text
//! raw text + QueryContext -> parser -> bound ast::Node -> order_by::extract_order_by_properties
//! ```

pub mod ast;
pub mod conversion;
pub mod error;
pub mod functions;
pub mod grammar;
pub mod order_by;
pub mod parser;
pub mod schema;
pub mod value;

pub use error::{ParseError, SchemaError};
pub use order_by::{extract_order_by_properties, OrderByError, OrderByPropertyNode};
pub use parser::{parse_filter, parse_order_by, MAX_DEPTH};
pub use schema::{Model, ModelBuilder, PrimitiveType, Property, PropertyRef, QueryContext, StructuredType, TypeRef};
pub use value::{CastError, Value};
